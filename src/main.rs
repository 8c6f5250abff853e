use SpectraFit::Examples::fit_examples::fit_examples;
use SpectraFit::Examples::slit_examples::slit_examples;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub fn main() {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    let task: usize = 0;
    fit_examples(task);
    slit_examples(task);
}
