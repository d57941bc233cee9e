use super::VERSION;
use clap::{App, Arg};
use std::path::PathBuf;

/// Takes the CLI arguments that control the plotting of the sensor time series.
pub fn parse_cli() -> (PathBuf, PathBuf) {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("path of the input csv file")
        .index(1)
        .required(true);
    let arg_imgout = Arg::with_name("output_imgfile")
        .help("path of the output image file, the extension picks the format")
        .index(2)
        .required(true);
    let cli_args = App::new("Wstation_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the weather station sensor time series")
        .arg(arg_csvin)
        .arg(arg_imgout)
        .get_matches();
    let csvin = PathBuf::from(cli_args.value_of("input_csvfile").unwrap_or_default());
    let imgout = PathBuf::from(cli_args.value_of("output_imgfile").unwrap_or_default());
    return (csvin, imgout);
}
