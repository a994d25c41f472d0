//! Reading routes and writing voyage results for the voyage wave simulator.
//! Routes and records are semicolon delimited CSV files, the voyage map is a plotly HTML file.
//! Author: G0rocks
//! Date: 2025-06-13

use crate::*;   // To use everything from the crate
use std::io;

/// Header of the voyage record CSV file
pub const RECORD_CSV_HEADER: [&str; 7] = [
    "elapsed_time[h]",
    "latitude[°]",
    "longitude[°]",
    "temperature[K]",
    "sea_state",
    "wave_height[m]",
    "speed[kn]",
];


/// Writes voyage records to a CSV file, one row per record in step order
/// Will overwrite any file with the same file name at csv_file_path.
/// csv_file_path must end with ".csv"
/// Note: The csv file delimiter is a semicolon
pub fn records_to_csv(csv_file_path: &str, records: &[VoyageRecord]) -> Result<(), VoyageError> {
    // Check if csv_file_path ends with ".csv"
    if !csv_file_path.ends_with(".csv") {
        return Err(VoyageError::Io(io::Error::new(io::ErrorKind::InvalidInput, "The filepath must end with \".csv\"")));
    }

    let file = std::fs::File::create(csv_file_path)?;
    return write_records(file, records);
}

/// Writes voyage records as semicolon delimited CSV with a header row to any writer
pub fn write_records<W: io::Write>(writer: W, records: &[VoyageRecord]) -> Result<(), VoyageError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(writer);

    wtr.write_record(RECORD_CSV_HEADER)?;

    for record in records {
        wtr.write_record(&[
            record.elapsed_hours.to_string(),
            record.latitude.to_string(),
            record.longitude.to_string(),
            record.temperature_k.to_string(),
            record.sea_state.to_string(),
            record.wave_height_m.to_string(),
            record.speed_knots.to_string(),
        ])?;
    }

    // Flush and close the writer
    wtr.flush()?;
    Ok(())
}


/// Loads a route from a CSV file
/// The CSV file is expected to have a header row and then one waypoint per row with the columns latitude;longitude in decimal degrees
/// The delimiter is a semicolon.
/// # Example:
/// `let route: Route = load_route("my_route.csv")?;`
pub fn load_route(file_path: &str) -> Result<Route, VoyageError> {
    let file = std::fs::File::open(file_path)?;
    return read_route(file);
}

/// Reads a route from semicolon delimited CSV, see load_route
pub fn read_route<R: io::Read>(reader: R) -> Result<Route, VoyageError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut waypoints: Vec<geo::Point> = Vec::new();

    for result in csv_reader.records() {
        let row = result?;
        let (latitude, longitude) = match (row.get(0), row.get(1)) {
            (Some(latitude), Some(longitude)) => (latitude, longitude),
            _ => return Err(VoyageError::InvalidCoordinate(row.iter().collect::<Vec<&str>>().join(";"))),
        };
        let original = format!("{};{}", latitude, longitude);
        waypoints.push(geo::Point::new(
            parse_degrees(longitude, &original)?,
            parse_degrees(latitude, &original)?,
        ));
    }

    return Route::new(waypoints);
}


/// Orthographic globe centred on the first waypoint, ocean in cyan
fn voyage_map_layout(route: &Route) -> plotly::Layout {
    let grid = || plotly::layout::Axis::new().show_grid(true).grid_color(plotly::color::Rgb::new(102, 102, 102));
    let first_waypoint = route.waypoints()[0];

    // Set layout as instructed by andrei-ng https://github.com/plotly/plotly.rs/pull/301
    plotly::Layout::new()
        .drag_mode(plotly::layout::DragMode::Zoom)
        .margin(plotly::layout::Margin::new().top(20).left(10).bottom(30).right(10))
        .auto_size(true)
        .geo(
            plotly::layout::LayoutGeo::new()
                .showocean(true)
                .showland(true)
                .showcountries(true)
                .oceancolor(plotly::color::Rgb::new(0, 255, 255))
                .landcolor(plotly::color::Rgb::new(230, 145, 56))
                .lataxis(grid())
                .lonaxis(grid())
                .center(plotly::layout::Center::new(first_waypoint.y(), first_waypoint.x()))
                .projection(plotly::layout::Projection::new().projection_type(plotly::layout::ProjectionType::Orthographic)),
        )
}

/// Draws the route and the simulated track on a world map with plotly and saves it as HTML
/// figure_file_path must end with ".html"
pub fn visualize_voyage(figure_file_path: &str, route: &Route, records: &[VoyageRecord]) -> Result<(), VoyageError> {
    if !figure_file_path.ends_with(".html") {
        return Err(VoyageError::Io(io::Error::new(io::ErrorKind::InvalidInput, "The filepath must end with \".html\"")));
    }

    // Setup trace of the simulated track
    let track_lat: Vec<f64> = records.iter().map(|r| r.latitude).collect();
    let track_lon: Vec<f64> = records.iter().map(|r| r.longitude).collect();
    let track = plotly::ScatterGeo::new(track_lat, track_lon)
        .name("Simulated track")
        .mode(plotly::common::Mode::Markers)
        .show_legend(true);

    // Setup trace of the route waypoints
    let route_lat: Vec<f64> = route.waypoints().iter().map(|p| p.y()).collect();
    let route_lon: Vec<f64> = route.waypoints().iter().map(|p| p.x()).collect();
    let waypoints = plotly::ScatterGeo::new(route_lat, route_lon)
        .name("Route")
        .mode(plotly::common::Mode::LinesMarkers)
        .show_legend(true);

    let mut figure = plotly::Plot::new();
    figure.add_trace(waypoints);
    figure.add_trace(track);
    figure.set_layout(voyage_map_layout(route));
    // Make responsive for automatically sizing according to window size
    let fig_config = figure.configuration().clone().responsive(true).fill_frame(true);
    figure.set_configuration(fig_config);

    figure.write_html(figure_file_path);
    Ok(())
}
