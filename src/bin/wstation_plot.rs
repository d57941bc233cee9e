use wstation_plot::plot::parse_cli;
use wstation_plot::TimeReadings;

fn main() {
    let (csvin, imgout) = parse_cli();
    println!(
        "read data from {} and plot to {}",
        csvin.display(),
        imgout.display()
    );
    let tr = match TimeReadings::from_csv(csvin) {
        Ok(tr) => tr,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = tr.plot_datetime(&imgout) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
