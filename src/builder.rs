//! Presentation building.
//!
//! [`PresentationBuilder`] drives the whole run ([`PresentationBuilder::run`]):
//! one model call per source chunk with a session checkpoint after each,
//! rendering the deck into the template, and the interactive refinement loop.

use crate::config::{ConfigError, DEFAULT_CHUNK_SIZE, DEFAULT_LAYOUT, MAX_CONTEXT_WORDS};
use crate::deck::{SlideContent, SlideDeck, parse_slides};
use crate::error::{Result, SlideError};
use crate::llm::prompt::slide_prompt;
use crate::llm::{ChatContext, LanguageModel};
use crate::opc::OpcError;
use crate::pptx::{PresentationWriter, Template, find_content_placeholder, read_deck, resolve_layout};
use crate::session::Session;
use crate::source::{self, SourceError};
use crate::terminal::{Console, Prompter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const WAIT_MESSAGE: &str = "OK, please wait. This might take a while...";
const FIRST_QUESTION: &str = "What shall I do for you?";
const REVIEW_QUESTION: &str = "Have a look at what we have got so far. Key in -1 to undo, or let me know if you want me to make further changes";
const RETRY_QUESTION: &str = "Hmm, not sure what you want so I did not make any changes. Try differently";
const UNDO_ANSWER: &str = "-1";

/// Attempts per summary before the raw text is used instead.
const SUMMARY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Layout for slides that do not name one
    pub default_layout: String,
    /// Checkpoint file written after every slide and revision
    pub session_path: PathBuf,
    /// Words per source chunk
    pub chunk_size: usize,
}

impl BuildOptions {
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        Self {
            default_layout: DEFAULT_LAYOUT.to_string(),
            session_path: session_path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub generated: usize,
    /// Chunks already in the session
    pub skipped: usize,
    /// Chunks recorded as placeholder slides after a model failure
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub slides: usize,
    /// Slides whose layout has no content placeholder; their body was dropped
    pub bodies_skipped: Vec<usize>,
    /// `(requested, used)` for layouts resolved by similarity
    pub substituted_layouts: Vec<(String, String)>,
}

/// What a run starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPlan {
    /// Source document to build slides from
    pub input: Option<PathBuf>,
    /// The session was loaded from a checkpoint
    pub resumed: bool,
    /// Refine by chat instead of rendering once
    pub interactive: bool,
}

pub struct PresentationBuilder<'a, M> {
    template: &'a Template,
    model: M,
    console: Console,
    options: BuildOptions,
}

impl<'a, M: LanguageModel> PresentationBuilder<'a, M> {
    pub fn new(template: &'a Template, model: M, console: Console, options: BuildOptions) -> Self {
        Self {
            template,
            model,
            console,
            options,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    fn check_layouts(&self) -> Result<()> {
        if self.template.layouts().is_empty() {
            return Err(ConfigError::NoLayouts.into());
        }
        Ok(())
    }

    /// A whole run: load the source, build the missing slides, then render
    /// or refine the deck.
    ///
    /// A non-empty session is saved to the session path on the way out, also
    /// when the run fails. A failed save only surfaces when the run itself
    /// succeeded.
    pub fn run(&self, plan: &RunPlan, output: &Path, session: &mut Session, prompter: &mut dyn Prompter) -> Result<()> {
        let result = self.generate(plan, output, session, prompter);

        if !session.is_empty() {
            self.console
                .line(&format!("Saving the session to {}", self.options.session_path.display()));
            if let Err(err) = session.save(&self.options.session_path) {
                if result.is_ok() {
                    return Err(err.into());
                }
                tracing::error!(error = %err, "could not save session");
            }
        }
        result
    }

    fn generate(&self, plan: &RunPlan, output: &Path, session: &mut Session, prompter: &mut dyn Prompter) -> Result<()> {
        self.check_layouts()?;

        // A resumed session keeps its chunking so chunk indices line up
        let chunk_size = session.chunk_size.unwrap_or(self.options.chunk_size);
        match (&plan.input, plan.resumed) {
            (Some(input), false) => {
                self.console.info("Loading the document into context ...");
                let text = source::read_all(input)?;
                session.source_text = self.prepare_context(&text)?;
                session.source_path = Some(input.clone());
                session.chunk_size = Some(chunk_size);
                self.console.info("Input article loaded successfully.");
            },
            (Some(input), true) => session.source_path = Some(input.clone()),
            (None, false) => {
                self.adopt_existing_output(output, session)?;
            },
            (None, true) => {},
        }

        if let Some(path) = session.source_path.clone() {
            let report = self.build(source::read_chunks(&path, chunk_size)?, session)?;
            if report.failed > 0 {
                self.console.warning(&format!(
                    "{} slide(s) could not be generated and were left empty",
                    report.failed
                ));
            }
        }

        if plan.interactive {
            self.refine(output, session, prompter)
        } else {
            let report = self.render(&session.current_deck(), output, prompter)?;
            self.console
                .info(&format!("Saved {} slides to {}", report.slides, output.display()));
            Ok(())
        }
    }

    /// Chat context for a source text, summarized when it is too long to be
    /// sent with every request.
    ///
    /// Long texts are split into ten parts that are summarized one by one; a
    /// part whose summary keeps failing is kept as is.
    pub fn prepare_context(&self, text: &str) -> Result<String> {
        self.check_layouts()?;
        let words = source::word_count(text);
        if words <= MAX_CONTEXT_WORDS {
            return Ok(text.to_string());
        }

        self.console.info("Document is big. Loading a summarized version into context ...");
        let parts: Vec<String> = source::chunk_text(text, (words / 10).max(1))?.collect::<source::Result<_>>()?;
        let bar = self.console.progress("Summarizing");
        let mut summaries = Vec::with_capacity(parts.len());
        for part in &parts {
            summaries.push(self.summarize_part(part)?);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let context = summaries.join("\n");
        tracing::debug!(words, summarized = source::word_count(&context), "summarized source");
        Ok(context)
    }

    fn summarize_part(&self, part: &str) -> Result<String> {
        for attempt in 1..=SUMMARY_ATTEMPTS {
            match self.model.summarize(part, None) {
                Ok(summary) if !summary.trim().is_empty() => return Ok(summary),
                Ok(_) => tracing::debug!(attempt, "empty summary"),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => tracing::warn!(attempt, error = %err, "summary failed"),
            }
        }
        Ok(part.to_string())
    }

    /// Generate one slide per chunk not yet in `session`, checkpointing after
    /// each.
    pub fn build<I>(&self, chunks: I, session: &mut Session) -> Result<BuildReport>
    where
        I: IntoIterator<Item = std::result::Result<String, SourceError>>,
    {
        self.check_layouts()?;

        let mut report = BuildReport::default();
        let bar = self.console.progress("Generating slides");
        for (index, chunk) in chunks.into_iter().enumerate() {
            let chunk = chunk?;
            if session.has_slide(index) {
                report.skipped += 1;
                bar.inc(1);
                continue;
            }

            let number = index + 1;
            let slide = match self.model.chat(&slide_prompt(&chunk, number), None) {
                Ok(response) => {
                    report.generated += 1;
                    slide_from_response(&response, number)
                },
                Err(err) => {
                    let err = SlideError::from(err);
                    if !err.is_recoverable() {
                        bar.abandon();
                        return Err(err);
                    }
                    tracing::warn!(chunk = index, error = %err, "slide generation failed");
                    bar.suspend(|| {
                        self.console
                            .warning(&format!("Could not generate slide {}: {}", number, err))
                    });
                    report.failed += 1;
                    SlideContent::new(number as f64, format!("Slide {}", number), "")
                },
            };

            session.record_slide(index, slide);
            session.save(&self.options.session_path)?;
            bar.inc(1);
        }
        bar.finish_and_clear();

        tracing::info!(
            generated = report.generated,
            skipped = report.skipped,
            failed = report.failed,
            "build finished"
        );
        Ok(report)
    }

    /// Write `deck` to `output` on top of the template.
    ///
    /// When the file cannot be written because it is open elsewhere, the
    /// user is asked to close it and the save is retried.
    pub fn render(&self, deck: &SlideDeck, output: &Path, prompter: &mut dyn Prompter) -> Result<RenderReport> {
        self.check_layouts()?;

        let mut writer = PresentationWriter::new(self.template)?;
        let mut report = RenderReport::default();
        for slide in deck {
            let requested = slide.layout.as_deref().unwrap_or(&self.options.default_layout);
            let layout = resolve_layout(self.template, requested)?;
            if layout.name() != requested {
                report
                    .substituted_layouts
                    .push((requested.to_string(), layout.name().to_string()));
            }

            let body = find_content_placeholder(layout);
            if body.is_none() && !slide.content.trim().is_empty() {
                self.console.warning(&format!(
                    "Layout '{}' has no content placeholder, skipping the body of slide {}",
                    layout.name(),
                    writer.slide_count() + 1
                ));
                report.bodies_skipped.push(writer.slide_count() + 1);
            }
            writer.add_slide(
                layout,
                &slide.title,
                body.map(|ph| (ph, slide.content.as_str())),
                &slide.narration,
            )?;
        }
        report.slides = writer.slide_count();

        loop {
            match writer.save(output) {
                Ok(()) => break,
                Err(SlideError::Package(OpcError::Io(err))) if err.kind() == ErrorKind::PermissionDenied => {
                    tracing::warn!(path = %output.display(), "output not writable");
                    self.console.warning(&format!(
                        "Could not write {}. If it is open in another program, close it first.",
                        output.display()
                    ));
                    if prompter.ask("Press Enter to try again")?.is_none() {
                        return Err(SlideError::Io(err));
                    }
                },
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(path = %output.display(), slides = report.slides, "rendered deck");
        Ok(report)
    }

    /// Seed an empty session from a deck already at `output`.
    ///
    /// Returns whether anything was loaded.
    pub fn adopt_existing_output(&self, output: &Path, session: &mut Session) -> Result<bool> {
        if !session.is_empty() {
            return Ok(false);
        }
        match read_deck(output)? {
            Some(deck) if deck.iter().any(|slide| !slide.is_blank()) => {
                self.console.warning(
                    "The output file is not empty but no session file is supplied. If you have the session file, consider continuing from the previously saved session.",
                );
                self.console.info("Loading the existing text content of the file into a new session...");
                session.push_revision(deck);
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    /// Interactive refinement.
    ///
    /// Renders the current deck and asks for changes until the answer is
    /// empty or input ends. `-1` undoes the latest revision.
    pub fn refine(&self, output: &Path, session: &mut Session, prompter: &mut dyn Prompter) -> Result<()> {
        self.check_layouts()?;

        let mut deck = session.current_deck();
        if deck.is_empty() {
            match self.first_deck(session, prompter)? {
                Some(first) => deck = first,
                None => return Ok(()),
            }
        } else if session.history.is_empty() {
            session.push_revision(deck.clone());
        }

        let mut question = REVIEW_QUESTION;
        loop {
            self.render(&deck, output, prompter)?;
            let Some(answer) = prompter.ask(question)? else {
                break;
            };
            let answer = answer.trim();
            if answer.is_empty() {
                break;
            }
            question = REVIEW_QUESTION;

            if answer == UNDO_ANSWER {
                self.console.info("Undoing changes and loading earlier version ...");
                session.undo();
                deck = session.current_deck();
                session.save(&self.options.session_path)?;
                continue;
            }

            self.console.info(WAIT_MESSAGE);
            if let Some(edited) = read_deck(output)? {
                deck = carry_layouts(edited, &deck);
            }
            let context = ChatContext::new(Some(session.source_text.as_str()), deck.slides());
            let revision = match self.model.chat(answer, Some(&context)) {
                Ok(response) => parse_slides(&response),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(error = %err, "revision request failed");
                    self.console.warning(&format!("The request failed: {}", err));
                    continue;
                },
            };
            match revision {
                Ok(revision) => {
                    deck = deck.merge(&revision);
                    tracing::debug!(changed = revision.len(), slides = deck.len(), "merged revision");
                    session.push_revision(deck.clone());
                    session.save(&self.options.session_path)?;
                },
                Err(err) => {
                    tracing::debug!(error = %err, "response is not a slide list");
                    question = RETRY_QUESTION;
                },
            }
        }
        Ok(())
    }

    /// Ask for the first deck when there is nothing to start from.
    fn first_deck(&self, session: &mut Session, prompter: &mut dyn Prompter) -> Result<Option<SlideDeck>> {
        let mut question = FIRST_QUESTION;
        loop {
            let Some(answer) = prompter.ask(question)? else {
                return Ok(None);
            };
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(None);
            }

            self.console.info(WAIT_MESSAGE);
            let context = ChatContext::new(Some(session.source_text.as_str()), &[]);
            let response = match self.model.chat(answer, Some(&context)) {
                Ok(response) => response,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(error = %err, "first request failed");
                    self.console.warning(&format!("The request failed: {}", err));
                    continue;
                },
            };
            match parse_slides(&response) {
                Ok(slides) => {
                    let deck = SlideDeck::default().merge(&slides);
                    session.push_revision(deck.clone());
                    session.save(&self.options.session_path)?;
                    return Ok(Some(deck));
                },
                Err(err) => {
                    tracing::debug!(error = %err, "response is not a slide list");
                    question = RETRY_QUESTION;
                },
            }
        }
    }
}

/// The first slide of a model response, numbered `number`; a response that
/// is not slide JSON becomes the body of an untitled slide.
fn slide_from_response(response: &str, number: usize) -> SlideContent {
    match parse_slides(response) {
        Ok(mut slides) if !slides.is_empty() => {
            if slides.len() > 1 {
                tracing::debug!(number, extra = slides.len() - 1, "dropped extra slides from response");
            }
            slides.swap_remove(0).renumbered(number as f64)
        },
        Ok(_) => SlideContent::new(number as f64, "", ""),
        Err(err) => {
            tracing::debug!(number, error = %err, "response is not slide JSON, using it as body text");
            SlideContent::new(number as f64, "", response.trim())
        },
    }
}

/// Layout choices survive a deck being read back from the file, which does
/// not record them.
fn carry_layouts(edited: SlideDeck, current: &SlideDeck) -> SlideDeck {
    edited
        .iter()
        .zip(current.iter().map(Some).chain(std::iter::repeat(None)))
        .map(|(slide, previous)| match previous.and_then(|p| p.layout.clone()) {
            Some(layout) => slide.clone().with_layout(layout),
            None => slide.clone(),
        })
        .collect::<Vec<_>>()
        .into()
}
