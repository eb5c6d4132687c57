//! Exploratory plots of the prepared dataset, rendered to SVG

use crate::error::{CardioError, Result};
use crate::features::TARGET_COLUMN;
use crate::preprocessing::columns_to_array2;
use ndarray::{Array2, Axis};
use plotters::prelude::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

const HISTOGRAM_BINS: usize = 10;

/// Files written by [`render_plots`]
#[derive(Debug, Clone)]
pub struct PlotPaths {
    pub class_balance: PathBuf,
    pub histograms: PathBuf,
    pub correlation: PathBuf,
}

impl PlotPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            class_balance: dir.join("class_balance.svg"),
            histograms: dir.join("histograms.svg"),
            correlation: dir.join("correlation.svg"),
        }
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> CardioError {
    CardioError::PlotError(e.to_string())
}

/// Write the class balance, per-column histograms and correlation heatmap
/// of `df` into `dir`
pub fn render_plots(df: &DataFrame, dir: impl AsRef<Path>) -> Result<PlotPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let paths = PlotPaths::in_dir(dir);

    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let x = columns_to_array2(df, &names)?;

    let target_idx = names
        .iter()
        .position(|n| n == TARGET_COLUMN)
        .ok_or_else(|| CardioError::FeatureNotFound(TARGET_COLUMN.to_string()))?;

    class_balance(&x.column(target_idx).to_vec(), &paths.class_balance)?;
    histograms(&x, &names, &paths.histograms)?;
    correlation_heatmap(&correlation_matrix(&x), &names, &paths.correlation)?;

    info!(dir = %dir.display(), "Plots written");
    Ok(paths)
}

fn class_balance(target: &[f64], path: &Path) -> Result<()> {
    let negatives = target.iter().filter(|&&t| t < 0.5).count() as u32;
    let positives = target.len() as u32 - negatives;
    let y_max = negatives.max(positives) + 5;

    let root = SVGBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Heart Disease Distribution", ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..1u32).into_segmented(), 0u32..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(TARGET_COLUMN)
        .y_desc("count")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(40)
                .data([(0u32, negatives), (1u32, positives)]),
        )
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// `(lower, upper, count)` for equal-width bins over `values`
fn bin_counts(values: &[f64], n_bins: usize) -> Vec<(f64, f64, f64)> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }

    let width = if max > min { (max - min) / n_bins as f64 } else { 1.0 };
    let mut counts = vec![0.0; n_bins];
    for &v in values {
        let bin = (((v - min) / width) as usize).min(n_bins - 1);
        counts[bin] += 1.0;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (min + i as f64 * width, min + (i + 1) as f64 * width, c))
        .collect()
}

fn histograms(x: &Array2<f64>, names: &[String], path: &Path) -> Result<()> {
    let n = names.len();
    let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
    let rows = n.div_ceil(cols).max(1);

    let root = SVGBackend::new(path, (cols as u32 * 300, rows as u32 * 220)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((rows, cols));

    for ((name, column), panel) in names.iter().zip(x.axis_iter(Axis(1))).zip(panels.iter()) {
        let bins = bin_counts(&column.to_vec(), HISTOGRAM_BINS);
        let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
            continue;
        };
        let y_max = bins.iter().map(|b| b.2).fold(1.0, f64::max) * 1.1;

        let mut chart = ChartBuilder::on(panel)
            .caption(name, ("sans-serif", 14).into_font())
            .margin(8)
            .x_label_area_size(20)
            .y_label_area_size(30)
            .build_cartesian_2d(first.0..last.1, 0.0..y_max)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_labels(4)
            .y_labels(4)
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(bins.iter().map(|&(lo, hi, count)| {
                Rectangle::new([(lo, 0.0), (hi, count)], BLUE.mix(0.6).filled())
            }))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Pearson correlation between the columns of `x`. Constant columns
/// correlate 0 with everything except themselves.
pub fn correlation_matrix(x: &Array2<f64>) -> Array2<f64> {
    let n_cols = x.ncols();
    let n_rows = x.nrows() as f64;

    let means: Vec<f64> = x.axis_iter(Axis(1)).map(|c| c.sum() / n_rows).collect();
    let centered = Array2::from_shape_fn(x.dim(), |(r, c)| x[[r, c]] - means[c]);
    let norms: Vec<f64> = centered
        .axis_iter(Axis(1))
        .map(|c| c.dot(&c).sqrt())
        .collect();

    Array2::from_shape_fn((n_cols, n_cols), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = norms[i] * norms[j];
        if denom == 0.0 {
            0.0
        } else {
            centered.column(i).dot(&centered.column(j)) / denom
        }
    })
}

/// Diverging blue-white-red scale for values in [-1, 1]
fn coolwarm(v: f64) -> RGBColor {
    let t = v.clamp(-1.0, 1.0);
    let lerp = |a: f64, b: f64, s: f64| (a + (b - a) * s).round() as u8;
    if t < 0.0 {
        let s = -t;
        RGBColor(lerp(247.0, 59.0, s), lerp(247.0, 76.0, s), lerp(247.0, 192.0, s))
    } else {
        RGBColor(lerp(247.0, 180.0, t), lerp(247.0, 4.0, t), lerp(247.0, 38.0, t))
    }
}

fn correlation_heatmap(corr: &Array2<f64>, names: &[String], path: &Path) -> Result<()> {
    let n = corr.nrows() as i32;

    let root = SVGBackend::new(path, (900, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature correlation", ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(0..n, 0..n)
        .map_err(plot_err)?;

    let label = |v: &i32| names.get(*v as usize).cloned().unwrap_or_default();
    let row_label = |v: &i32| {
        names
            .get((n - 1 - *v).max(0) as usize)
            .cloned()
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n as usize)
        .y_labels(n as usize)
        .x_label_formatter(&label)
        .y_label_formatter(&row_label)
        .draw()
        .map_err(plot_err)?;

    // row 0 is drawn at the top
    chart
        .draw_series(corr.indexed_iter().map(|((i, j), &v)| {
            let x = j as i32;
            let y = n - 1 - i as i32;
            Rectangle::new([(x, y), (x + 1, y + 1)], coolwarm(v).filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_correlation_matrix() {
        let x = array![[1.0, 2.0, 5.0, 3.0], [2.0, 4.0, 4.0, 3.0], [3.0, 6.0, 3.0, 3.0]];
        let corr = correlation_matrix(&x);

        assert!((corr[[0, 1]] - 1.0).abs() < 1e-12);
        assert!((corr[[0, 2]] + 1.0).abs() < 1e-12);
        assert_eq!(corr[[0, 3]], 0.0);
        assert_eq!(corr[[3, 3]], 1.0);
        assert_eq!(corr, corr.t());
    }

    #[test]
    fn test_bin_counts_cover_all_values() {
        let values = [0.0, 0.5, 1.0, 9.9, 10.0];
        let bins = bin_counts(&values, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.2).sum::<f64>(), 5.0);
        assert_eq!(bins[9].2, 2.0);
    }

    #[test]
    fn test_coolwarm_endpoints() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(247, 247, 247));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
    }

    #[test]
    fn test_render_plots_writes_svgs() {
        let df = df!(
            "age" => &[63.0, 67.0, 41.0, 56.0],
            "chol" => &[233.0, 286.0, 204.0, 236.0],
            "target" => &[0i64, 1, 0, 1]
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let paths = render_plots(&df, dir.path()).unwrap();

        for path in [&paths.class_balance, &paths.histograms, &paths.correlation] {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"), "{} is not an svg", path.display());
        }
    }
}
