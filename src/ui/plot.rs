use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoint, PlotPoints, Points, Text};

use ec_peaks::color::{MARKER_RGB, generate_palette};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Peak preview (central panel)
// ---------------------------------------------------------------------------

/// Render the first analysed series of the last run with its peaks.
pub fn preview_plot(ui: &mut Ui, state: &AppState) {
    let preview = match &state.preview {
        Some(p) => p,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Fill in the parameters and press Run");
            });
            return;
        }
    };

    let series = &preview.analysis.series;
    let markers = preview.analysis.markers(preview.direction);
    let [r, g, b] = MARKER_RGB;
    let marker_color = Color32::from_rgb(r, g, b);

    ui.label(preview.title.as_str());

    Plot::new("peak_preview")
        .legend(Legend::default())
        .x_axis_label(series.index_name.clone())
        .y_axis_label("Signal")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let palette = generate_palette(series.columns.len());
            for ((name, values), [r, g, b]) in series.columns.iter().zip(&series.values).zip(palette) {
                let points: PlotPoints = series
                    .index
                    .iter()
                    .zip(values)
                    .map(|(&x, &y)| [x, y])
                    .collect();
                plot_ui.line(
                    Line::new(points)
                        .name(name)
                        .color(Color32::from_rgb(r, g, b))
                        .width(1.5),
                );
            }

            // Prominence lines with their value written halfway up.
            for m in &markers {
                plot_ui.line(
                    Line::new(PlotPoints::new(vec![[m.x, m.y], [m.x, m.base]]))
                        .color(marker_color)
                        .width(1.0),
                );
                plot_ui.text(
                    Text::new(PlotPoint::new(m.x, (m.y + m.base) / 2.0), m.label.clone())
                        .color(marker_color),
                );
            }

            let peaks: PlotPoints = markers.iter().map(|m| [m.x, m.y]).collect();
            plot_ui.points(
                Points::new(peaks)
                    .name("peaks")
                    .shape(MarkerShape::Cross)
                    .radius(5.0)
                    .color(marker_color),
            );
        });
}
