//! Command-line front end.
//!
//! ```sh
//! slidewright -t template.pptx -o deck -i report.docx
//! slidewright -t template.pptx -o deck -s deck_pptx_session.json --interactive
//! ```

use clap::Parser;
use slidewright::builder::{BuildOptions, PresentationBuilder, RunPlan};
use slidewright::config::{DEFAULT_CHUNK_SIZE, DEFAULT_LAYOUT, LlmConfig};
use slidewright::llm::OpenAiClient;
use slidewright::logging::{self, DEFAULT_LOG_FILE};
use slidewright::pptx::Template;
use slidewright::session::Session;
use slidewright::terminal::{Console, StdinPrompter};
use slidewright::Result;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Draft a PowerPoint deck from a document with an LLM
#[derive(Parser, Debug)]
#[command(name = "slidewright", version)]
struct Args {
    /// PowerPoint template whose layouts the slides use
    #[arg(short, long, value_name = "PPTX")]
    template: PathBuf,

    /// Output presentation; `.pptx` is appended when missing
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Word document or text file to build the slides from
    #[arg(short, long, value_name = "SOURCE", required_unless_present_any = ["session", "interactive"])]
    input: Option<PathBuf>,

    /// Words of source per slide
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Resume a previously saved session
    #[arg(short, long, value_name = "JSON")]
    session: Option<PathBuf>,

    /// Layout for slides that do not ask for one
    #[arg(short, long, default_value = DEFAULT_LAYOUT)]
    layout: String,

    /// Refine the deck by chatting after it is built
    #[arg(long)]
    interactive: bool,

    /// TOML file with LLM settings
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Mirror the debug log to stderr
    #[arg(short, long)]
    debug: bool,

    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let console = if args.no_color { Console::new(false) } else { Console::detect() };

    let _guard = match logging::init(args.debug, &args.log_file) {
        Ok(guard) => Some(guard),
        Err(err) => {
            console.warning(&format!("Could not open log file {}: {}", args.log_file.display(), err));
            None
        },
    };

    match run(&args, console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            console.error(&format!("Something went wrong: {}", err));
            ExitCode::FAILURE
        },
    }
}

fn run(args: &Args, console: Console) -> Result<()> {
    let output = output_path(&args.output);
    let config = LlmConfig::load(args.config.as_deref())?;
    let model = OpenAiClient::new(&config)?;
    let template = Template::open(&args.template)?;
    tracing::info!(
        template = %args.template.display(),
        layouts = template.layouts().len(),
        "loaded template"
    );

    let (mut session, session_path) = match &args.session {
        Some(path) => {
            console.info("Resuming a previously saved session ...");
            (Session::load(path)?, path.clone())
        },
        None => (Session::default(), Session::fresh_path(&output)),
    };

    let mut options = BuildOptions::new(&session_path);
    options.default_layout = args.layout.clone();
    options.chunk_size = args.chunk_size;
    let builder = PresentationBuilder::new(&template, model, console, options);

    let plan = RunPlan {
        input: args.input.clone(),
        resumed: args.session.is_some(),
        interactive: args.interactive,
    };
    builder.run(&plan, &output, &mut session, &mut StdinPrompter::new(console))
}

/// `deck` → `deck.pptx`; `deck.pptx` is kept.
fn output_path(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pptx"));
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".pptx");
        PathBuf::from(name)
    }
}
