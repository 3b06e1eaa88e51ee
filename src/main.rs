use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tracecov::highlight::Highlighter;
use tracecov::{diff, mail, report};

/// tracecov — browsable HTML reports and regression alerts for
/// trace-style line coverage files.
#[derive(Parser)]
#[command(name = "tracecov", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a directory of .cover listings into linked HTML pages.
    Report {
        /// Directory containing the coverage listings.
        #[arg(default_value = "coverage")]
        input_dir: PathBuf,

        /// Directory for the HTML output (created if absent).
        #[arg(default_value = "coverage/reports")]
        output_dir: PathBuf,

        /// Be quiet.
        #[arg(short, long, overrides_with = "verbose")]
        quiet: bool,

        /// Be verbose (default).
        #[arg(short, long, overrides_with = "quiet")]
        verbose: bool,
    },

    /// Compare two directories of .cover listings and flag coverage
    /// regressions.
    Diff {
        /// Coverage listings from the older test run.
        old_dir: PathBuf,

        /// Coverage listings from the newer test run.
        new_dir: PathBuf,

        /// Only consider files matching REGEX (repeatable).
        #[arg(long, value_name = "REGEX")]
        include: Vec<String>,

        /// Ignore files matching REGEX (repeatable).
        #[arg(long, value_name = "REGEX")]
        exclude: Vec<String>,

        /// Email the report to ADDR instead of printing it
        /// (sent only if regressions were found).
        #[arg(long, value_name = "ADDR")]
        email: Option<String>,

        /// Sender address for the emailed report.
        #[arg(long = "from", value_name = "ADDR")]
        sender: Option<String>,

        /// Subject for the emailed report.
        #[arg(
            long,
            value_name = "TEXT",
            default_value = "Unit test coverage regression"
        )]
        subject: String,

        /// Base URL of the HTML-ized reports; adds a hyperlink to each
        /// finding.
        #[arg(long, value_name = "BASEURL")]
        web_url: Option<String>,

        /// SMTP host used with --email.
        #[arg(long, value_name = "HOST", default_value = mail::DEFAULT_SMTP_HOST)]
        smtp_host: String,

        /// SMTP port used with --email.
        #[arg(long, value_name = "PORT", default_value_t = mail::DEFAULT_SMTP_PORT)]
        smtp_port: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input_dir,
            output_dir,
            quiet,
            verbose: _,
        } => {
            report::make_coverage_reports(&input_dir, &output_dir, !quiet, &Highlighter::default())
                .context("Failed to generate coverage reports")?;
        }
        Commands::Diff {
            old_dir,
            new_dir,
            include,
            exclude,
            email,
            sender,
            subject,
            web_url,
            smtp_host,
            smtp_port,
        } => {
            let include = diff::compile_patterns(&include)?;
            let exclude = diff::compile_patterns(&exclude)?;

            match email {
                Some(to) => {
                    let mailer = mail::SmtpMailer::new(smtp_host, smtp_port);
                    let mut reporter =
                        diff::ReportEmailer::new(sender, to, subject, web_url, Box::new(mailer));
                    diff::compare_dirs(&old_dir, &new_dir, &include, &exclude, &mut reporter)?;
                    reporter.send()?;
                }
                None => {
                    let mut reporter = diff::ReportPrinter::new(web_url);
                    diff::compare_dirs(&old_dir, &new_dir, &include, &exclude, &mut reporter)?;
                }
            }
        }
    }
    Ok(())
}

