use std::{process, sync::Arc, time::Duration};

use serde::Serialize;
use tidecast::{
    application::{
        error::AppError,
        repos::{ContentSource, ContentStore, StoreError},
    },
    artifacts::ArtifactGenerator,
    cache::{
        AggregationCache, CacheConfig, FetchOutcome, PageCache, PageScope, RefreshListener, Signal,
    },
    config::{self, IndexArgs, PageArgs, Settings, StoreBackend, WatchArgs},
    infra::{
        db::PostgresContentStore,
        error::InfraError,
        http::HttpContentClient,
        memory::{InMemoryContentStore, StoreSource},
        telemetry,
    },
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::validation(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let store = open_store(&settings).await?;

    match cli_args.command {
        config::Command::Generate(_) => run_generate(&settings, store).await,
        config::Command::Index(args) => run_index(&settings, store, args).await,
        config::Command::Page(args) => run_page(&settings, store, args).await,
        config::Command::Watch(args) => run_watch(&settings, store, args).await,
    }
}

async fn open_store(settings: &Settings) -> Result<Arc<dyn ContentStore>, AppError> {
    match &settings.store.backend {
        StoreBackend::Memory {
            seed_file: Some(path),
        } => Ok(Arc::new(InMemoryContentStore::load_seed(path).await?)),
        StoreBackend::Memory { seed_file: None } => {
            warn!("No seed file configured; the in-memory store starts empty");
            Ok(Arc::new(InMemoryContentStore::new()))
        }
        StoreBackend::Postgres {
            url,
            max_connections,
            acquire_timeout,
        } => {
            let pool = PostgresContentStore::connect(url, max_connections.get(), *acquire_timeout)
                .await
                .map_err(|err| AppError::from(StoreError::unavailable(err)))?;
            let store = PostgresContentStore::new(pool);
            store.health_check().await?;
            info!(max_connections = max_connections.get(), "Connected to content store");
            Ok(Arc::new(store))
        }
    }
}

fn page_source(
    settings: &Settings,
    store: Arc<dyn ContentStore>,
) -> Result<Arc<dyn ContentSource>, AppError> {
    match &settings.store.content_base_url {
        Some(base) => {
            let client = HttpContentClient::new(base.as_str(), settings.store.connect_timeout)?;
            Ok(Arc::new(client))
        }
        None => Ok(Arc::new(StoreSource::new(store))),
    }
}

async fn run_generate(settings: &Settings, store: Arc<dyn ContentStore>) -> Result<(), AppError> {
    let generator = ArtifactGenerator::new(store, settings.artifacts.paths.clone())
        .with_short_name_limit(settings.artifacts.short_name_limit.get());

    let report = generator.run().await?;
    if report.is_success() {
        info!(resolved = report.resolved, "Artifacts generated");
    } else {
        warn!(resolved = report.resolved, "Artifacts generated with failures");
    }

    print_json(&report).await
}

async fn run_index(
    settings: &Settings,
    store: Arc<dyn ContentStore>,
    args: IndexArgs,
) -> Result<(), AppError> {
    let cache = AggregationCache::from_config(store, &CacheConfig::from(&settings.cache));
    let index = cache.index_all().await;

    if index.store_unavailable {
        return Err(StoreError::Unavailable("every domain read failed".to_string()).into());
    }

    if args.context {
        print_text(&index.render_context()).await
    } else {
        print_json(index.as_ref()).await
    }
}

async fn run_page(
    settings: &Settings,
    store: Arc<dyn ContentStore>,
    args: PageArgs,
) -> Result<(), AppError> {
    if args.grouped {
        let grouped = store.fetch_grouped(&args.page).await?;
        return print_json(&grouped).await;
    }

    let cache = PageCache::new(page_source(settings, store)?, scope_for(&args.page, args.section));
    let outcome = cache.fetch_content().await;

    match args.key {
        Some(key) => print_text(&cache.get_content(&key, &args.fallback)).await,
        None => {
            if matches!(outcome, FetchOutcome::Failed { .. }) {
                return Err(
                    StoreError::Unavailable(format!("failed to read page `{}`", args.page)).into(),
                );
            }
            print_json(cache.blocks().as_ref()).await
        }
    }
}

async fn run_watch(
    settings: &Settings,
    store: Arc<dyn ContentStore>,
    args: WatchArgs,
) -> Result<(), AppError> {
    let cache = Arc::new(PageCache::new(
        page_source(settings, store)?,
        scope_for(&args.page, args.section),
    ));
    let mut applied = cache.subscribe();

    let outcome = cache.fetch_content().await;
    info!(page = %args.page, ?outcome, "Page cache mounted");
    print_json_line(cache.blocks().as_ref()).await?;
    let _ = applied.borrow_and_update();

    let (trigger, listener) = RefreshListener::mount(CacheConfig::from(&settings.cache), cache.clone());
    let listener_handle = listener.spawn();

    // After stdin closes, wait out one more debounce cycle so trailing
    // signals still print their refresh.
    let drain_grace = settings.cache.signal_debounce + Duration::from_secs(1);
    let mut stdin_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match Signal::parse(&line) {
                            Ok(signal) => {
                                let epoch = trigger.publish(signal);
                                info!(epoch, "Signal queued");
                            }
                            Err(err) => warn!(%line, error = %err, "Ignoring unparsable signal"),
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(err) => break Err(AppError::from(InfraError::Io(err))),
                }
            }
            changed = applied.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let _ = applied.borrow_and_update();
                print_json_line(cache.blocks().as_ref()).await?;
            }
            _ = tokio::time::sleep(drain_grace), if !stdin_open => break Ok(()),
        }
    };

    listener_handle.abort();
    let _ = listener_handle.await;
    result
}

fn scope_for(page: &str, section: Option<String>) -> PageScope {
    let scope = PageScope::new(page);
    match section {
        Some(section) => scope.with_section(section),
        None => scope,
    }
}

async fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    print_text(&rendered).await
}

async fn print_json_line<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    print_text(&rendered).await
}

async fn print_text(text: &str) -> Result<(), AppError> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .await
        .map_err(InfraError::Io)?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await.map_err(InfraError::Io)?;
    }
    stdout.flush().await.map_err(InfraError::Io)?;
    Ok(())
}
