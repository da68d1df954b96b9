use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use llm_doc_translator::client::{self, TranslateJob};
use llm_doc_translator::reencode::OutputFormat;
use llm_doc_translator::{TargetLanguage, settings};

#[derive(Parser, Debug)]
#[command(
    name = "llm-doc-translator",
    version,
    about = "Translate PDF, Word and text documents with a chat-completion API"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (upload page and API)
    Serve {
        /// Listen address (overrides [server].addr)
        #[arg(long = "addr")]
        addr: Option<String>,
    },
    /// Upload a file to a running server and print the translation
    Translate {
        /// File to translate (.txt, .pdf, .doc, .docx)
        file: PathBuf,

        /// Target language (en, zh, es, fr, de, ja, ko, ru, ar)
        #[arg(short = 'l', long = "lang", default_value = "en")]
        lang: String,

        /// Server base URL (default: http://<[server].addr>)
        #[arg(long = "server")]
        server: Option<String>,

        /// Also save the translation as txt, md, docx or pdf
        #[arg(long = "format")]
        format: Option<String>,

        /// Output path for --format (default: translated_<name>.<ext>)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_doc_translator::logging::init(cli.verbose)?;
    let settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;

    match cli.command {
        Command::Serve { addr } => llm_doc_translator::server::run_server(settings, addr).await,
        Command::Translate {
            file,
            lang,
            server,
            format,
            output,
        } => {
            let lang = TargetLanguage::parse_field(Some(lang.as_str()))?;
            let format = format.as_deref().map(OutputFormat::parse).transpose()?;
            let server = server.unwrap_or_else(|| format!("http://{}", settings.server.addr));
            let job = TranslateJob {
                path: file,
                lang,
                server,
                format,
                output,
            };
            let outcome = client::run_translate_job(&job, &settings.export).await?;
            println!("{}", outcome.translation);
            if let Some(path) = outcome.written {
                eprintln!("saved: {}", path.display());
            }
            Ok(())
        }
    }
}
