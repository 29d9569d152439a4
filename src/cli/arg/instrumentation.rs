/*! Logging setup for the `hdikit` binary

Logs go to stderr so stdout stays free for the JSON the subcommands print.
*/
use std::io::IsTerminal;

use eyre::WrapErr;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Logger {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(clap::Args, Debug, Default)]
pub struct Instrumentation {
    /// Log each `hdiutil`/`diskutil` invocation, -vv to include their output
    #[clap(short = 'v', env = "HDIKIT_VERBOSITY", long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Format of the logs written to stderr
    #[clap(long, env = "HDIKIT_LOGGER", default_value_t = Default::default(), global = true)]
    pub logger: Logger,
    /// Extra tracing directives, applied after `RUST_LOG` or the verbosity default
    #[clap(long = "log-directive", global = true, env = "HDIKIT_LOG_DIRECTIVES", value_delimiter = ',', num_args = 0..)]
    pub log_directives: Vec<Directive>,
}

impl Instrumentation {
    /// Library spans stay quiet unless `-v` is given; the subcommands report at `info`.
    pub fn default_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME");
        match self.verbose {
            0 => format!("{krate}=warn,{krate}::cli=info"),
            1 => format!("{krate}=debug"),
            _ => format!("{krate}=trace"),
        }
    }

    pub fn setup(&self) -> eyre::Result<()> {
        tracing_subscriber::registry()
            .with(self.filter_layer()?)
            .with(ErrorLayer::default())
            .with(self.fmt_layer())
            .try_init()?;

        Ok(())
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
    {
        let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        match self.logger {
            Logger::Compact => layer
                .with_ansi(std::io::stderr().is_terminal())
                .compact()
                .without_time()
                .with_target(false)
                .boxed(),
            Logger::Pretty => layer
                .with_ansi(std::io::stderr().is_terminal())
                .pretty()
                .boxed(),
            Logger::Json => layer.with_ansi(false).json().flatten_event(true).boxed(),
        }
    }

    pub fn filter_layer(&self) -> eyre::Result<EnvFilter> {
        let mut filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            EnvFilter::try_from_default_env().wrap_err("Parsing RUST_LOG directives")?
        } else {
            EnvFilter::try_new(self.default_directives())?
        };

        for directive in &self.log_directives {
            filter = filter.add_directive(directive.clone());
        }

        Ok(filter)
    }
}
