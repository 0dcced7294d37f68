use anyhow::{Context, Result};
use attrition::reporter::{UNAVAILABLE, is_unavailable};
use attrition::{
    AnswerSet, AttritionError, AttritionModel, CategoryEncoding, Collector, CollectorEvent, Field,
    Outcome, Questionnaire, Reporter, TrainConfig, UnknownCategory, Verdict, load_csv,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "attrition")]
#[command(about = "Employee attrition prediction", long_about = None)]
#[command(version)]
struct Cli {
    /// Trained model file (MessagePack)
    #[arg(long, global = true, env = "ATTRITION_MODEL", default_value = "model.msgpack")]
    model: PathBuf,

    /// Employee dataset (CSV with an Attrition column)
    #[arg(long, global = true, env = "ATTRITION_DATA", default_value = "data/employee_data.csv")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    OneHot,
    Ordinal,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from the dataset and save it
    Train {
        #[arg(long, default_value_t = 0.3)]
        test_ratio: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 2000)]
        max_iterations: u64,

        #[arg(long, value_enum, default_value_t = EncodingArg::OneHot)]
        encoding: EncodingArg,

        /// Fail on categories unseen in training instead of ignoring them
        #[arg(long)]
        strict_categories: bool,

        /// Train on the raw class ratio instead of oversampling leavers
        #[arg(long)]
        no_balance: bool,

        /// Number of most influential features to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Predict from a complete set of employee details
    Predict {
        #[arg(long)]
        age: String,
        #[arg(long)]
        gender: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        education: String,
        #[arg(long)]
        years_at_company: String,
        #[arg(long)]
        job_satisfaction: String,
        #[arg(long)]
        monthly_income: String,
    },

    /// Answer the questions one by one
    Chat,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            test_ratio,
            seed,
            max_iterations,
            encoding,
            strict_categories,
            no_balance,
            top,
        } => {
            let config = TrainConfig {
                test_ratio,
                seed,
                max_iterations,
                encoding: match encoding {
                    EncodingArg::OneHot => CategoryEncoding::OneHot,
                    EncodingArg::Ordinal => CategoryEncoding::Ordinal,
                },
                unknown: if strict_categories {
                    UnknownCategory::Error
                } else {
                    UnknownCategory::Ignore
                },
                balance_classes: !no_balance,
                ..TrainConfig::default()
            };
            train(&cli, &config, top)
        }
        Commands::Predict {
            ref age,
            ref gender,
            ref department,
            ref education,
            ref years_at_company,
            ref job_satisfaction,
            ref monthly_income,
        } => {
            let raw = [
                (Field::Age, age.as_str()),
                (Field::Gender, gender.as_str()),
                (Field::Department, department.as_str()),
                (Field::Education, education.as_str()),
                (Field::YearsAtCompany, years_at_company.as_str()),
                (Field::JobSatisfaction, job_satisfaction.as_str()),
                (Field::MonthlyIncome, monthly_income.as_str()),
            ];
            let answers = AnswerSet::from_raw(&Questionnaire::default_questions(), raw)?;
            let reporter = load_reporter(&cli)?;
            let row = reporter.schema().encode(&answers)?;
            let verdict = reporter.verdict(&row).map_err(unavailable)?;
            println!("{}", render(&verdict));
            Ok(())
        }
        Commands::Chat => {
            let reporter = load_reporter(&cli)?;
            chat(&reporter)
        }
    }
}

fn train(cli: &Cli, config: &TrainConfig, top: usize) -> Result<()> {
    let records =
        load_csv(&cli.data).with_context(|| format!("failed to load {}", cli.data.display()))?;
    let model = AttritionModel::train(&records, config)?;

    if let Some(report) = model.evaluation() {
        println!("✅ Model trained with accuracy: {:.3}", report.accuracy);
        println!("{report}");
    }

    println!("Most influential features (coefficient, positive = leave):");
    for (name, weight) in model.top_features(top) {
        println!("{name:>25} | {weight:+.3}");
    }

    model
        .save_to_file(&cli.model)
        .with_context(|| format!("failed to save {}", cli.model.display()))?;
    println!("📦 Model saved as {}", cli.model.display());
    Ok(())
}

/// A stale model is retrained with the configuration it was saved with; the
/// defaults only apply when no model file exists yet.
fn load_reporter(cli: &Cli) -> Result<Reporter> {
    let config = TrainConfig::default();
    let model = AttritionModel::load_or_train_if_stale(&cli.model, &cli.data, &config)
        .map_err(|e| anyhow::anyhow!("{UNAVAILABLE} ({e})"))?;
    Ok(Reporter::from_model(Arc::new(model)))
}

fn unavailable(e: AttritionError) -> anyhow::Error {
    if is_unavailable(&e) {
        anyhow::anyhow!("{UNAVAILABLE} ({e})")
    } else {
        e.into()
    }
}

fn render(verdict: &Verdict) -> String {
    let icon = match verdict.outcome {
        Outcome::Leave => "⚠️",
        Outcome::Stay => "✅",
    };
    format!("{icon} {verdict}")
}

fn chat(reporter: &Reporter) -> Result<()> {
    let mut session = Collector::new(Arc::new(Questionnaire::default_questions()));

    println!("🤖 Hi! Let's get started. Type 'reset' to start over or 'exit' to quit.");
    if let Some(prompt) = session.current_prompt() {
        println!("{prompt}");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.eq_ignore_ascii_case("reset") {
            session.reset();
            println!("🔄 Starting over.");
            if let Some(prompt) = session.current_prompt() {
                println!("{prompt}");
            }
            continue;
        }

        match session.submit(input) {
            Ok(CollectorEvent::NextQuestion { prompt, .. }) => println!("{prompt}"),
            Ok(CollectorEvent::Invalid { message, .. }) => println!("❗ {message}"),
            Ok(CollectorEvent::Completed(_)) => {
                match reporter.report(&mut session) {
                    Ok(verdict) => println!("{}", render(&verdict)),
                    Err(e) if is_unavailable(&e) => println!("⚠️ {UNAVAILABLE}"),
                    Err(e) => println!("❗ {e}"),
                }
                println!("Type 'reset' to assess another employee or 'exit' to quit.");
            }
            Err(AttritionError::SessionCompleted) => {
                println!("This conversation is finished. Type 'reset' to start a new one.");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
