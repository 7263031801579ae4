use clap::Parser;

/// This is a survey-wave aggregation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the survey: wave data sources,
    /// questions of interest, group comparisons and presence metadata.
    /// For more information about the file format, read the documentation.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing a previously produced summary
    /// in JSON format. If provided, wavetab will check that the produced
    /// summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be
    /// written in JSON format to the given location. Setting this option
    /// overrides the output directory that may be specified in the
    /// configuration file.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
