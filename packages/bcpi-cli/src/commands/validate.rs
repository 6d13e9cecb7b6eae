use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use bcpi_rs::BcpiConfig;
use std::path::Path;

pub fn execute(args: ValidateArgs) -> i32 {
    let path = BcpiConfig::resolve_path(args.config.as_deref().map(Path::new));

    let config = match BcpiConfig::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}: {}", path.display(), e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    if args.json {
        return output::emit(&config, false, &output::Destination::Stdout);
    }

    let filter = &config.preproc.filter;
    println!("Configuration OK ({})", path.display());
    println!(
        "  filter:      order {} band {:?}-{:?} Hz",
        filter.order, filter.cuton_hz, filter.cutoff_hz
    );
    println!("  decimate:    x{}", config.preproc.decimate.factor);
    println!(
        "  standardize: {} s history",
        config.preproc.standardize.history_duration_s
    );
    println!(
        "  decode:      {} harmonics, freqs {:?}",
        config.decode.harmonics, config.decode.default_freqs
    );
    println!("  mapping:     {} labels", config.mapping.mapping().len());
    exit_codes::SUCCESS
}
