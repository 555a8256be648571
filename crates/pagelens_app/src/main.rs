mod app;
mod cli;
mod effects;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use lens_logging::{lens_info, LogDestination};
use log::LevelFilter;
use pagelens_core::{visible_prompts, Msg, PasteStatus, RetryPolicy, Settings};
use pagelens_engine::{
    Browser, ContentCoordinator, LlmClient, LlmSettings, OpenAiClient, PageLoader, SettingsStore,
};

use crate::app::PanelSession;
use crate::cli::{AnalyzeArgs, Cli, Commands, SettingsAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let store = match &cli.settings {
        Some(path) => SettingsStore::new(path.clone()),
        None => SettingsStore::in_dir(&default_settings_dir()),
    };

    match cli.command {
        Commands::Extract { source } => extract(&source).await,
        Commands::Analyze(args) => analyze(&store, args).await,
        Commands::Prompts { url } => {
            list_prompts(&store, url.as_deref());
            Ok(())
        }
        Commands::Settings { action } => settings(&store, action),
    }
}

fn init_logging(cli: &Cli) {
    if cli.verbose {
        lens_logging::initialize(LogDestination::Both(cli.log_file.clone()), LevelFilter::Debug);
    } else {
        lens_logging::initialize(LogDestination::File(cli.log_file.clone()), LevelFilter::Info);
    }
}

fn default_settings_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("pagelens"))
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn extract(source: &str) -> anyhow::Result<()> {
    let load = PageLoader::default()
        .load(source)
        .await
        .with_context(|| format!("could not load {source}"))?;
    let browser = Arc::new(Browser::default());
    let tab = browser.open_tab(load);
    let coordinator = ContentCoordinator::new(browser.clone(), browser, RetryPolicy::default());

    let content = coordinator.extract(tab).await?;
    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}

async fn analyze(store: &SettingsStore, args: AnalyzeArgs) -> anyhow::Result<()> {
    let settings = store.get_settings();
    let load = PageLoader::default()
        .load(&args.source)
        .await
        .with_context(|| format!("could not load {}", args.source))?;
    let url = load.url.clone();

    let browser = Arc::new(Browser::default());
    let coordinator =
        ContentCoordinator::new(browser.clone(), browser.clone(), RetryPolicy::default());
    let llm_settings = LlmSettings {
        model: settings.model.clone(),
        ..LlmSettings::default()
    };
    let llm = OpenAiClient::new(settings.api_key.clone(), llm_settings)
        .map(|client| Arc::new(client) as Arc<dyn LlmClient>);

    let mut session = PanelSession::new(browser.clone(), coordinator, llm, args.system)
        .show_progress(true);
    session.dispatch(Msg::SettingsLoaded {
        prompts: settings.prompts(),
        max_length: settings.max_length,
    });
    browser.open_tab(load);
    session.run_until(|view| view.current_url == url).await;

    match (args.prompt, args.preset) {
        (Some(prompt), _) => {
            session.dispatch(Msg::InputChanged(prompt));
            session.dispatch(Msg::AnalyzeClicked);
        }
        (None, Some(label)) => {
            session.dispatch(Msg::PromptSelected {
                label: label.clone(),
            });
            if !session.view().loading {
                bail!("no prompt labelled {label:?} applies to {url}");
            }
        }
        (None, None) => bail!("either --prompt or --preset is required"),
    }
    session.run_until(|view| !view.loading).await;

    let view = session.view();
    // anyhow adds its own "Error: " prefix.
    let result = render::outcome(&view)
        .map_err(|message| anyhow!(message.trim_start_matches("Error: ").to_string()))?;
    let Some(result) = result else {
        bail!("the analysis produced no result");
    };
    println!("{result}");

    if args.paste {
        session.dispatch(Msg::CopyClicked);
        session.run_until(|view| view.paste_status.is_some()).await;
        if let Some(PasteStatus::Failed(message)) = session.view().paste_status {
            bail!("paste failed: {message}");
        }
    }
    Ok(())
}

fn list_prompts(store: &SettingsStore, url: Option<&str>) {
    let prompts = store.custom_prompts();
    let shown: Vec<_> = match url {
        Some(url) => visible_prompts(&prompts, url),
        None => prompts.iter().collect(),
    };
    println!("{}", render::prompt_table(&shown));
}

fn settings(store: &SettingsStore, action: SettingsAction) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = store.get_settings();
            println!("# {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(&masked(settings))?);
        }
        SettingsAction::Set {
            api_key,
            model,
            max_length,
        } => {
            let mut settings = store.get_settings();
            if let Some(api_key) = api_key {
                settings.api_key = api_key;
            }
            if let Some(model) = model {
                settings.model = model;
            }
            if let Some(max_length) = max_length {
                settings.max_length = max_length;
            }
            let saved = store.save_settings(settings)?;
            lens_info!("Settings updated (model={}, max_length={})", saved.model, saved.max_length);
            println!("Saved settings to {}", store.path().display());
        }
        SettingsAction::ResetPrompts => {
            store.reset_prompts()?;
            println!("Prompts reset to the built-in set");
        }
    }
    Ok(())
}

fn masked(mut settings: Settings) -> Settings {
    if settings.has_api_key() {
        let chars: Vec<char> = settings.api_key.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        settings.api_key = format!("****{tail}");
    }
    settings
}
