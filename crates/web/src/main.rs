use std::{error::Error, process::ExitCode, sync::Arc};

use charging::{
    collector::CollectorRef, config::PipelineConfig, database::Database, health::HealthReporter,
    memory::MemoryDatabase, server::Server,
};
use chrono::Utc;
use clap::Parser;
use database::{DatabaseConnectionInfo, PgDatabase};
use openchargemap::collector::PipelineCollector;
use web::{
    cli::{self, Application, Command, ScheduleArgs},
    start_web_server, WebState,
};

/// Exit status of `check` when the offline share is above the threshold.
const ALERT_EXIT_CODE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();

    let application = Application::parse();
    let config = PipelineConfig::from_env()?;

    if application.dry_run {
        log::info!("dry run, stations are only kept in memory");
        return execute(application.command, MemoryDatabase::new(), config).await;
    }

    // database
    let database_connection_info =
        DatabaseConnectionInfo::from_env().ok_or("expected database connection info in env.")?;
    let database = PgDatabase::connect(database_connection_info).await?;

    execute(application.command, database, config).await
}

async fn execute<D: Database>(
    command: Command,
    database: D,
    config: PipelineConfig,
) -> Result<ExitCode, Box<dyn Error>> {
    let server = Server::new(database);

    match command {
        Command::Run(args) => {
            let config = args.config(config);
            let pipeline = args.pipeline(&config).await?;
            let client = server.client("Run");

            let summary = pipeline.run(&client, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            let stats = client.get_stats(config.top_cities).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Schedule(args) => {
            let config = args.pipeline.config(config);
            schedule(&server, &args, &config).await?.join().await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check(args) => {
            let config = args.config(config);
            let (report, failures) = cli::monitor(&config)
                .check(&server.client("Health Check"))
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            for failure in &failures {
                eprintln!("alert delivery failed: {failure}");
            }
            if report.is_healthy() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(ALERT_EXIT_CODE))
            }
        }
        Command::Serve(args) => {
            let config = args.scheduled.pipeline.config(config);
            let collector = if args.schedule {
                Some(schedule(&server, &args.scheduled, &config).await?)
            } else {
                None
            };

            let state = WebState {
                station_client: server.client("REST API"),
                staleness: config.staleness,
                health: HealthReporter::new(config.health),
                top_cities: config.top_cities,
            };
            let served = start_web_server(state, args.bind).await;
            if let Some(collector) = collector {
                collector.abort();
            }
            served?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn schedule<D: Database>(
    server: &Server<D>,
    args: &ScheduleArgs,
    config: &PipelineConfig,
) -> Result<CollectorRef, Box<dyn Error>> {
    let pipeline = Arc::new(args.pipeline.pipeline(config).await?);
    let monitor = Arc::new(cli::monitor(config));
    let tick = args.tick();
    log::info!("running the pipeline every {} hours", args.every_hours.max(1));

    Ok(server.collector(move || {
        PipelineCollector::new(pipeline.clone())
            .with_monitor(monitor.clone())
            .with_tick(tick)
    }))
}
