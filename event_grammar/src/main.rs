use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use chartparse::FeatureGrammar;
use event_grammar::{validate, FeatureSchema, InterpretError, Interpreter, Reading};

/// Parses English sentences into event-semantic formulas.
#[derive(Parser)]
#[clap(name = "event-grammar", version)]
struct Opts {
    /// Feature grammar to load instead of the embedded event grammar.
    #[clap(short, long, parse(from_os_str), global = true)]
    grammar: Option<PathBuf>,
    /// Print results as JSON.
    #[clap(long, global = true)]
    json: bool,
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Prints every reading of the sentence.
    Parse { sentence: String },
    /// Interprets the newline separated sentences in the provided file. Lines starting with `#`
    /// are skipped.
    Batch {
        #[clap(short, long, parse(from_os_str))]
        path: PathBuf,
    },
    /// Checks the grammar for unbound semantics, arity mismatches and inconsistent features.
    Check {
        /// Treat features outside the event grammar's schema as errors.
        #[clap(long)]
        strict: bool,
    },
    /// Prints the productions of the grammar.
    Rules,
}

#[derive(Serialize)]
struct ReadingSummary {
    tree: String,
    sem: String,
}

impl From<&Reading> for ReadingSummary {
    fn from(reading: &Reading) -> Self {
        ReadingSummary {
            tree: reading.tree.skeleton(),
            sem: reading.sem.to_string(),
        }
    }
}

#[derive(Serialize)]
struct SentenceSummary<'a> {
    sentence: &'a str,
    readings: Vec<ReadingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct RuleSummary {
    line: usize,
    production: String,
}

fn load_grammar(path: &Path) -> Result<FeatureGrammar> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read grammar from {}", path.display()))?;
    text.parse::<FeatureGrammar>()
        .with_context(|| format!("could not load grammar from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_readings(sentence: &str, readings: &[Reading]) {
    if readings.is_empty() {
        println!("No parse for \"{}\"", sentence);
        return;
    }
    for (i, reading) in readings.iter().enumerate() {
        println!("Reading {}/{}", i + 1, readings.len());
        println!("{}", reading.tree.pretty());
        println!("{}", reading.sem);
    }
}

fn summarize<'a>(
    sentence: &'a str,
    result: &Result<Vec<Reading>, InterpretError>,
) -> SentenceSummary<'a> {
    match result {
        Ok(readings) => SentenceSummary {
            sentence,
            readings: readings.iter().map(ReadingSummary::from).collect(),
            error: None,
        },
        Err(e) => SentenceSummary {
            sentence,
            readings: vec![],
            error: Some(e.to_string()),
        },
    }
}

fn parse_sentence(grammar: &FeatureGrammar, sentence: &str, json: bool) -> Result<()> {
    let interpreter = Interpreter::new(grammar);
    let result = interpreter.interpret(sentence);
    if json {
        return print_json(&summarize(sentence, &result));
    }
    let readings = result.with_context(|| format!("could not interpret \"{}\"", sentence))?;
    print_readings(sentence, &readings);
    Ok(())
}

fn batch(grammar: &FeatureGrammar, path: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read sentences from {}", path.display()))?;
    let interpreter = Interpreter::new(grammar);

    let sentences: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let mut summaries = Vec::new();
    let mut parsed = 0;
    for sentence in &sentences {
        let result = interpreter.interpret(sentence);
        match &result {
            Ok(readings) if !readings.is_empty() => parsed += 1,
            Ok(_) => {}
            Err(e) => log::warn!("could not interpret \"{}\": {}", sentence, e),
        }
        if json {
            summaries.push(summarize(sentence, &result));
        } else {
            println!("{}", "=".repeat(80));
            println!("Sentence: {}", sentence);
            match &result {
                Ok(readings) => print_readings(sentence, readings),
                Err(e) => println!("Error: {}", e),
            }
        }
    }

    if json {
        return print_json(&summaries);
    }
    println!("{}", "=".repeat(80));
    println!("          Sentences: {}", sentences.len());
    println!("Successfully parsed: {}", parsed);
    Ok(())
}

fn check(grammar: &FeatureGrammar, strict: bool, json: bool) -> Result<()> {
    let schema = FeatureSchema::event_grammar().strict(strict);
    let diagnostics = validate(grammar, Some(&schema));
    if json {
        print_json(&diagnostics)?;
    } else {
        for diagnostic in &diagnostics {
            println!("{}", diagnostic);
        }
    }

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors != 0 {
        bail!("grammar has {} errors", errors);
    }
    if !json {
        println!(
            "{} productions, {} warnings",
            grammar.productions().len(),
            diagnostics.len()
        );
    }
    Ok(())
}

fn rules(grammar: &FeatureGrammar, json: bool) -> Result<()> {
    if json {
        let rules: Vec<_> = grammar
            .productions()
            .iter()
            .map(|p| RuleSummary {
                line: p.line,
                production: p.to_string(),
            })
            .collect();
        return print_json(&rules);
    }
    print!("{}", grammar);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let opts: Opts = Opts::parse();

    let loaded;
    let grammar = match &opts.grammar {
        Some(path) => {
            loaded = load_grammar(path)?;
            &loaded
        }
        None => event_grammar::grammar().context("the embedded grammar is malformed")?,
    };

    match opts.command {
        SubCommand::Parse { sentence } => parse_sentence(grammar, &sentence, opts.json),
        SubCommand::Batch { path } => batch(grammar, &path, opts.json),
        SubCommand::Check { strict } => check(grammar, strict, opts.json),
        SubCommand::Rules => rules(grammar, opts.json),
    }
}
