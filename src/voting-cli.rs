//! A command-line client for the voting API.
//! Requests and responses go through the same types the server uses, so it
//! is by definition compatible with our endpoints.

use std::fmt::Display;

use clap::{Arg, ArgAction, ArgMatches, Command};

use ovs_backend::{
    client::{ApiClient, ClientError},
    model::{
        api::{auth::SignupRequest, id::ApiId},
        common::election::ElectionStatus,
    },
};

const PROGRAM_NAME: &str = "voting-cli";

const ABOUT_TEXT: &str = "Take part in online elections from the command line.

EXIT CODES:
     0: Success.
     1: The server rejected the request.
     2: The server could not be reached.";

const SERVER: &str = "SERVER";
const TOKEN: &str = "TOKEN";
const USERNAME: &str = "USERNAME";
const EMAIL: &str = "EMAIL";
const PASSWORD: &str = "PASSWORD";
const NATIONAL_ID: &str = "NATIONAL_ID";
const STATUS: &str = "STATUS";
const ELECTION_ID: &str = "ELECTION_ID";
const CANDIDATE_ID: &str = "CANDIDATE_ID";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    let election_id = Arg::new(ELECTION_ID)
        .help("The election to act on")
        .action(ArgAction::Set)
        .value_parser(clap::value_parser!(ApiId))
        .required(true);

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg(
            Arg::new(SERVER)
                .long("server")
                .env("OVS_SERVER")
                .help("Base URL of the voting server")
                .default_value("http://localhost:8000")
                .action(ArgAction::Set)
                .global(true),
        )
        .arg(
            Arg::new(TOKEN)
                .long("token")
                .env("OVS_TOKEN")
                .help("Bearer token from a previous `signin`")
                .action(ArgAction::Set)
                .global(true),
        )
        .subcommand(
            Command::new("signup")
                .about("Create a voter account")
                .arg(Arg::new(USERNAME).long("username").required(true))
                .arg(Arg::new(EMAIL).long("email").required(true))
                .arg(Arg::new(PASSWORD).long("password").required(true))
                .arg(Arg::new(NATIONAL_ID).long("national-id").required(true)),
        )
        .subcommand(
            Command::new("signin")
                .about("Sign in and print a token for `--token`")
                .arg(Arg::new(EMAIL).long("email").required(true))
                .arg(Arg::new(PASSWORD).long("password").required(true)),
        )
        .subcommand(
            Command::new("elections").about("List elections").arg(
                Arg::new(STATUS)
                    .long("status")
                    .help("Only list elections in this state")
                    .value_parser(["upcoming", "active", "completed"]),
            ),
        )
        .subcommand(
            Command::new("results")
                .about("Show the results of a completed election")
                .arg(election_id.clone()),
        )
        .subcommand(
            Command::new("vote")
                .about("Cast a vote")
                .arg(election_id)
                .arg(
                    Arg::new(CANDIDATE_ID)
                        .help("The candidate to vote for")
                        .action(ArgAction::Set)
                        .value_parser(clap::value_parser!(ApiId))
                        .required(true),
                ),
        )
        .subcommand(Command::new("history").about("Show your voting history"))
}

fn status_arg(value: &str) -> Option<ElectionStatus> {
    match value {
        "upcoming" => Some(ElectionStatus::Upcoming),
        "active" => Some(ElectionStatus::Active),
        "completed" => Some(ElectionStatus::Completed),
        _ => None,
    }
}

fn plural(count: u64) -> &'static str {
    if count != 1 {
        "s"
    } else {
        ""
    }
}

/// Get a required string argument. Clap has already checked it is present.
fn required<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map(String::as_str).unwrap_or_default()
}

/// Run one subcommand, printing its output line by line.
async fn execute(args: &ArgMatches) -> Result<Vec<String>, ClientError> {
    let server: &String = args.get_one(SERVER).unwrap(); // Has a default.
    let mut client = ApiClient::new(server.as_str());
    if let Some(token) = args.get_one::<String>(TOKEN) {
        client = client.with_token(token.as_str());
    }

    let mut lines = Vec::new();
    match args.subcommand() {
        Some(("signup", sub)) => {
            let request = SignupRequest {
                username: required(sub, USERNAME).to_string(),
                email: required(sub, EMAIL).to_string(),
                password: required(sub, PASSWORD).to_string(),
                national_id: required(sub, NATIONAL_ID).to_string(),
            };
            lines.push(client.signup(&request).await?.message);
        }
        Some(("signin", sub)) => {
            let response = client
                .signin(required(sub, EMAIL), required(sub, PASSWORD))
                .await?;
            lines.push(response.token);
        }
        Some(("elections", sub)) => {
            let status = sub.get_one::<String>(STATUS).and_then(|s| status_arg(s));
            for election in client.list_elections(status).await?.elections {
                lines.push(format!(
                    "{} [{}] {} ({} vote{})",
                    election.id,
                    election.status,
                    election.title,
                    election.total_votes,
                    plural(election.total_votes)
                ));
            }
        }
        Some(("results", sub)) => {
            let election_id: &ApiId = sub.get_one(ELECTION_ID).unwrap(); // Required.
            let results = client.results(*election_id).await?;
            lines.push(format!("Total: {} vote{}", results.total_votes, plural(results.total_votes)));
            for result in results.results {
                lines.push(format!(
                    "{}: {} vote{} ({}%)",
                    result.name,
                    result.votes,
                    plural(result.votes),
                    result.percentage
                ));
            }
        }
        Some(("vote", sub)) => {
            let election_id: &ApiId = sub.get_one(ELECTION_ID).unwrap(); // Required.
            let candidate_id: &ApiId = sub.get_one(CANDIDATE_ID).unwrap(); // Required.
            let cast = client.vote(*election_id, *candidate_id).await?;
            lines.push(format!("{}: {}", cast.message, cast.candidate_name));
        }
        Some(("history", _)) => {
            for entry in client.my_history().await?.voting_history {
                let ballot = match entry.vote_details {
                    Some(details) => format!("voted for {} at {}", details.candidate_name, details.voted_at),
                    None => "did not vote".to_string(),
                };
                lines.push(format!(
                    "{} [{}] {}: {ballot}",
                    entry.election_id, entry.election_status, entry.election_title
                ));
            }
        }
        _ => unreachable!("a subcommand is required"),
    }
    Ok(lines)
}

fn report<T: Display>(lines: Result<Vec<T>, ClientError>) -> u8 {
    match lines {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            0
        }
        Err(ClientError::Api { status, message }) => {
            println!("Request failed ({status}): {message}");
            1
        }
        Err(ClientError::Http(err)) => {
            println!("Could not reach the server: {err}");
            2
        }
    }
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    let exit_code = report(execute(&args).await);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_cli_usage() {
        let command_line = [
            PROGRAM_NAME,
            "--server",
            "http://example.com",
            "vote",
            "64b7f1e2a1b2c3d4e5f60718",
            "64b7f1e2a1b2c3d4e5f60719",
        ];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(
            args.get_one::<String>(SERVER).map(String::as_str),
            Some("http://example.com")
        );
        let (name, sub) = args.subcommand().unwrap();
        assert_eq!(name, "vote");
        assert_eq!(
            sub.get_one::<ApiId>(CANDIDATE_ID).unwrap().to_string(),
            "64b7f1e2a1b2c3d4e5f60719"
        );

        let command_line = [PROGRAM_NAME, "elections", "--status", "active"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        let (_, sub) = args.subcommand().unwrap();
        let status = sub.get_one::<String>(STATUS).and_then(|s| status_arg(s));
        assert_eq!(status, Some(ElectionStatus::Active));

        let command_line = [PROGRAM_NAME, "signin", "--email", "a@b.com", "--password", "pw"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        let (_, sub) = args.subcommand().unwrap();
        assert_eq!(required(sub, EMAIL), "a@b.com");
    }

    #[test]
    fn bad_cli_usage() {
        // No subcommand.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();

        // Not an ID.
        let command_line = [PROGRAM_NAME, "results", "not-an-id"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // Unknown status.
        let command_line = [PROGRAM_NAME, "elections", "--status", "cancelled"];
        cli().try_get_matches_from(command_line).unwrap_err();
    }

    #[test]
    fn exit_codes() {
        assert_eq!(report(Ok(vec!["done"])), 0);
        let rejected: Result<Vec<String>, _> = Err(ClientError::Api {
            status: reqwest::StatusCode::CONFLICT,
            message: "Already voted".to_string(),
        });
        assert_eq!(report(rejected), 1);
    }

    #[rocket::async_test]
    async fn unreachable_server() {
        // Nothing listens on port 9 locally.
        let command_line = [PROGRAM_NAME, "--server", "http://127.0.0.1:9", "history"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(report(execute(&args).await), 2);
    }
}
