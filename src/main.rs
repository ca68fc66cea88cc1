use std::{process, sync::Arc};

use commons::{
    application::{
        archive::{ArchiveConfig, ArchiveDocument, ArchiveExporter, MergeImporter},
        error::{AppError, ErrorReport},
        posts::CommonsService,
    },
    cache::{self, CacheConfig},
    config,
    domain::query::{PermissionContext, QuerySpec},
    infra::{error::InfraError, policy::MaintenancePolicy, store::TomlStore, telemetry},
};
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
    let report = ErrorReport::from_error("commons::main", error);
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Posts(args) => run_posts(settings, args).await,
        config::Command::Export(args) => run_export(settings, args).await,
        config::Command::Merge(args) => run_merge(settings, args).await,
    }
}

async fn build_service(settings: &config::Settings) -> Result<CommonsService, AppError> {
    let store = Arc::new(TomlStore::open(settings.storage.data_file.clone()).await?);
    let cache = cache::build(&CacheConfig::from(&settings.cache));
    let policy = Arc::new(MaintenancePolicy);

    Ok(CommonsService::new(
        store.clone(),
        store,
        cache,
        policy.clone(),
        policy,
    ))
}

fn require_site(site: &str) -> Result<(), AppError> {
    if site.trim().is_empty() {
        return Err(AppError::validation("--site must not be empty"));
    }
    Ok(())
}

async fn run_posts(settings: config::Settings, args: config::PostsArgs) -> Result<(), AppError> {
    require_site(&args.site)?;
    let service = build_service(&settings).await?;

    let spec = if args.personal {
        QuerySpec::personal_feed(args.site.as_str(), args.caller.as_str())
    } else {
        let commons_id = args.commons.clone().unwrap_or_else(|| args.site.clone());
        QuerySpec::scope(commons_id, args.site.as_str(), args.caller.as_str())
    };
    let spec = spec.with_context(PermissionContext::new(args.caller.as_str()));

    let posts = service.get_posts(spec).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&posts)
            .map_err(|err| AppError::unexpected(format!("failed to encode posts: {err}")))?;
        println!("{rendered}");
        return Ok(());
    }

    for post in &posts {
        println!(
            "{} [{}] {} ({} comment(s))",
            post.id,
            post.creator_id,
            post.content,
            post.comment_count()
        );
        for comment in &post.comments {
            println!("    [{}] {}", comment.creator_id, comment.content);
        }
    }
    info!(
        target = "commons::posts",
        count = posts.len(),
        "Listed posts"
    );
    Ok(())
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    require_site(&args.site)?;
    let service = build_service(&settings).await?;
    let exporter = ArchiveExporter::new(service, ArchiveConfig::from(&settings.archive));

    let mut document = ArchiveDocument::new(&args.site);
    let summary = exporter.export(&args.site, &mut document.root).await;

    let encoded = document.to_toml()?;
    tokio::fs::write(&args.file, encoded)
        .await
        .map_err(InfraError::Io)?;

    print!("{summary}");

    if !summary.is_success() {
        warn!(
            target = "commons::export",
            path = %args.file.display(),
            "Archive written with errors"
        );
        return Err(AppError::unexpected(
            "export finished with errors; see the summary above",
        ));
    }

    info!(
        target = "commons::export",
        path = %args.file.display(),
        archived = summary.archived(),
        "Archive written"
    );
    Ok(())
}

async fn run_merge(settings: config::Settings, args: config::MergeArgs) -> Result<(), AppError> {
    require_site(&args.site)?;
    let input = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(InfraError::Io)?;
    let document = ArchiveDocument::from_toml(&input)?;

    let service = build_service(&settings).await?;
    let importer = MergeImporter::new(service);
    let report = importer.merge(&document.root, &args.site).await;

    println!("{report}");
    info!(
        target = "commons::merge",
        source_site = document.source_site().unwrap_or("unknown"),
        target_site = %args.site,
        stored = report.stored,
        clean = report.is_clean(),
        "Merge complete"
    );

    match report.into_first_failure() {
        Some(error) => Err(AppError::from(error)),
        None => Ok(()),
    }
}
