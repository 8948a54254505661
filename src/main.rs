use anyhow::{anyhow, Context};
use courtside::app::CourtsideApp;
use courtside::client::model::{
    ComparisonRequest, ComparisonResponse, PredictionRequest, PredictionResponse, TeamDirectory,
};
use courtside::client::retrier::{ErrorKind, RequestError};
use courtside::config::CourtsideConfig;
use courtside::telemetry;

enum CliCommand {
    Predict {
        home: String,
        away: String,
        season: Option<String>,
    },
    Compare {
        team1: String,
        team2: String,
        season: Option<String>,
    },
    Teams,
    Status,
    Help,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise telemetry")?;

    let (config_path, command) = parse_cli_args()?;
    if matches!(command, CliCommand::Help) {
        print_help();
        return Ok(());
    }

    let config = CourtsideConfig::load(config_path.as_deref())
        .context("failed to load configuration")?;
    let app = CourtsideApp::initialise(&config).context("failed to construct application")?;

    let result = run_command(&app, command).await;
    app.shutdown();
    result
}

fn parse_cli_args() -> anyhow::Result<(Option<String>, CliCommand)> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut season = None;
    let mut positionals = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("expected path after {arg}"))?;
                config_path = Some(value);
            }
            "-s" | "--season" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("expected season after {arg}"))?;
                season = Some(value);
            }
            "-h" | "--help" => return Ok((config_path, CliCommand::Help)),
            other if other.starts_with('-') => {
                anyhow::bail!("unrecognised option `{other}`");
            }
            other => positionals.push(other.to_string()),
        }
    }

    let mut positionals = positionals.into_iter();
    let command = match positionals.next().as_deref() {
        None => CliCommand::Help,
        Some("predict") => {
            let home = positionals
                .next()
                .ok_or_else(|| anyhow!("predict requires <HOME> and <AWAY> team codes"))?;
            let away = positionals
                .next()
                .ok_or_else(|| anyhow!("predict requires <HOME> and <AWAY> team codes"))?;
            CliCommand::Predict { home, away, season }
        }
        Some("compare") => {
            let team1 = positionals
                .next()
                .ok_or_else(|| anyhow!("compare requires <TEAM1> and <TEAM2> team codes"))?;
            let team2 = positionals
                .next()
                .ok_or_else(|| anyhow!("compare requires <TEAM1> and <TEAM2> team codes"))?;
            CliCommand::Compare {
                team1,
                team2,
                season,
            }
        }
        Some("teams") => CliCommand::Teams,
        Some("status") => CliCommand::Status,
        Some(other) => anyhow::bail!("unrecognised command `{other}`"),
    };

    if let Some(extra) = positionals.next() {
        anyhow::bail!("unexpected argument `{extra}`");
    }

    Ok((config_path, command))
}

async fn run_command(app: &CourtsideApp, command: CliCommand) -> anyhow::Result<()> {
    match command {
        CliCommand::Predict { home, away, season } => {
            let request = PredictionRequest::new(&home, &away, season);
            let response = app
                .predict(request)
                .await
                .map_err(|err| anyhow!(describe_request_error(&err)))?;
            print_prediction(&response);
            Ok(())
        }
        CliCommand::Compare {
            team1,
            team2,
            season,
        } => {
            let request = ComparisonRequest::new(&team1, &team2, season);
            let team1 = request.team1.clone();
            let team2 = request.team2.clone();
            let response = app
                .compare(request)
                .await
                .map_err(|err| anyhow!(describe_request_error(&err)))?;
            print_comparison(&team1, &team2, &response);
            Ok(())
        }
        CliCommand::Teams => {
            let directory = app
                .teams()
                .await
                .map_err(|err| anyhow!(describe_request_error(&err)))?;
            print_teams(&directory);
            Ok(())
        }
        CliCommand::Status => {
            let snapshot = app.probe_status().await;
            println!(
                "service status: {} (after {} probe attempt(s))",
                snapshot.status, snapshot.attempts
            );
            Ok(())
        }
        CliCommand::Help => {
            print_help();
            Ok(())
        }
    }
}

fn describe_request_error(err: &RequestError) -> String {
    match err.kind {
        ErrorKind::Validation | ErrorKind::Auth => err.message.clone(),
        ErrorKind::ServerCold => format!(
            "the prediction service is waking up; give it a moment and retry ({})",
            err.message
        ),
        ErrorKind::Timeout | ErrorKind::Network | ErrorKind::ServerError => {
            format!("{}; please try again", err.message)
        }
    }
}

fn print_prediction(response: &PredictionResponse) {
    let (home, away) = response.prediction.probability.as_fractions();
    println!("Predicted winner: {}", response.prediction.winner);
    println!("  home win probability: {:.0}%", home * 100.0);
    println!("  away win probability: {:.0}%", away * 100.0);
    if let Some(confidence) = response.prediction.confidence {
        println!("  confidence: {:.0}%", confidence * 100.0);
    }

    if let Some(teams) = &response.teams {
        for (label, team) in [("home", &teams.home), ("away", &teams.away)] {
            if team.stats.is_empty() {
                continue;
            }
            let stats = team
                .stats
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("  {label} ({}): {stats}", team.name);
        }
    }
}

fn print_comparison(team1: &str, team2: &str, response: &ComparisonResponse) {
    let names = response.stat_names();
    if names.is_empty() {
        println!("no statistics found for either team");
        return;
    }

    let width = names.iter().map(String::len).max().unwrap_or(4).max(4);
    println!("{:<width$}  {team1:>12}  {team2:>12}", "stat");
    for name in &names {
        println!(
            "{name:<width$}  {:>12.1}  {:>12.1}",
            response.stat(team1, name),
            response.stat(team2, name),
        );
    }

    if let Some(head_to_head) = &response.head_to_head {
        let summary = head_to_head
            .iter()
            .map(|(team, wins)| format!("{team} {wins:.0}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("head-to-head: {summary}");
    }
}

fn print_teams(directory: &TeamDirectory) {
    for team in &directory.teams {
        match &team.conference {
            Some(conference) => {
                println!("{:<4} {} ({conference})", team.abbreviation, team.name)
            }
            None => println!("{:<4} {}", team.abbreviation, team.name),
        }
    }
}

fn print_help() {
    println!(
        "\
Usage: courtside [OPTIONS] <COMMAND>

Commands:
  predict <HOME> <AWAY>    Predict the outcome of a matchup
  compare <TEAM1> <TEAM2>  Compare season statistics for two teams
  teams                    List the teams the service knows about
  status                   Probe the service until readiness settles

Options:
  -c, --config <PATH>      Path to a courtside YAML config file
  -s, --season <SEASON>    Season to query (default 2024-2025)
  -h, --help               Print this help message
"
    );
}
