//! Command implementations for the CLI.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, warn};

use ariel_client::{ApiResponse, ArielClient, Transport};
use ariel_common::{Search, SearchStatus};

use crate::Command;
use crate::display::format_progress;

/// Settings for the submit-and-wait workflow.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Delay between status checks.
    pub poll_interval: Duration,
    /// Status checks allowed before giving up.
    pub max_polls: u32,
    /// Accept type for the results.
    pub response_type: String,
}

/// Runs one subcommand and returns the response to print.
pub async fn execute<T: Transport>(
    client: &ArielClient<T>,
    command: Command,
) -> Result<ApiResponse> {
    let response = match command {
        Command::Ping => client.ping_box().await?,
        Command::Databases => client.get_databases().await?,
        Command::Database { name } => client.get_database(&name).await?,
        Command::Searches => client.get_searches().await?,
        Command::Create { query } => client.create_search(&query).await?,
        Command::Status { id } => client.get_search(&id).await?,
        Command::Results {
            id,
            response_type,
            range_start,
            range_end,
        } => {
            client
                .get_search_results(&id, &response_type, range_start, range_end)
                .await?
        }
        Command::Update {
            id,
            save_results,
            status,
        } => client.update_search(&id, save_results, status).await?,
        Command::Delete { id } => client.delete_search(&id).await?,
        Command::Run {
            query,
            poll_interval,
            max_polls,
            response_type,
        } => {
            let options = RunOptions {
                poll_interval: Duration::from_secs(poll_interval),
                max_polls,
                response_type,
            };
            run_search(client, &query, &options).await?
        }
    };
    Ok(response)
}

/// Submits `query`, waits for the search to finish, and fetches its results.
///
/// Gives up after `max_polls` status checks, cancelling the search on the
/// console first.
pub async fn run_search<T: Transport>(
    client: &ArielClient<T>,
    query: &str,
    options: &RunOptions,
) -> Result<ApiResponse> {
    let created = ensure_success(client.create_search(query).await?, "Create search")?;
    let mut search: Search = created
        .json()
        .context("Unexpected response to create search")?;
    debug!("Submitted search {}", search.search_id);

    let mut polls = 0;
    while !search.is_finished() {
        if polls >= options.max_polls {
            cancel(client, &search.search_id).await;
            bail!(
                "Search {} did not finish after {polls} status checks",
                search.search_id
            );
        }

        tokio::time::sleep(options.poll_interval).await;
        let response = ensure_success(client.get_search(&search.search_id).await?, "Get search")?;
        search = response
            .json()
            .context("Unexpected response to get search")?;
        polls += 1;
        eprintln!("{}", format_progress(&search));
    }

    if search.status != SearchStatus::Completed {
        let reasons: Vec<&str> = search
            .error_messages
            .iter()
            .filter_map(|message| message.description.as_deref())
            .collect();
        if reasons.is_empty() {
            bail!("Search {} ended with status {}", search.search_id, search.status);
        }
        bail!(
            "Search {} ended with status {}: {}",
            search.search_id,
            search.status,
            reasons.join("; ")
        );
    }

    let results = client
        .get_search_results(&search.search_id, &options.response_type, None, None)
        .await?;
    ensure_success(results, "Get search results")
}

async fn cancel<T: Transport>(client: &ArielClient<T>, search_id: &str) {
    match client
        .update_search(search_id, None, Some(SearchStatus::Canceled))
        .await
    {
        Ok(response) if response.is_success() => debug!("Cancelled search {search_id}"),
        Ok(response) => warn!("Cancelling search {search_id} returned {}", response.status),
        Err(e) => warn!("Cancelling search {search_id} failed: {e}"),
    }
}

/// Turns a non-2xx response into an error carrying the body.
pub fn ensure_success(response: ApiResponse, action: &str) -> Result<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }
    bail!("{action} failed with {}: {}", response.status, response.text())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use ariel_client::{RestApiClient, transport_config};
    use ariel_common::{AuthConfig, ConnectionConfig, RetryConfig};
    use serde_json::json;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ArielClient {
        let connection = ConnectionConfig::new("siem.local", Some(443), 5)
            .with_retry_config(RetryConfig::disabled());
        let auth = AuthConfig::with_sec("token");
        let transport = RestApiClient::new(transport_config(&connection, &auth).unwrap())
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap();
        ArielClient::with_transport(transport, &connection)
    }

    fn options(max_polls: u32) -> RunOptions {
        RunOptions {
            poll_interval: Duration::from_millis(10),
            max_polls,
            response_type: "application/json".to_string(),
        }
    }

    async fn mount_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/ariel/searches"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "search_id": "s1",
                "status": "WAIT",
                "progress": 0
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_run_search_waits_for_completion() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_id": "s1",
                "status": "EXECUTE",
                "progress": 50
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_id": "s1",
                "status": "COMPLETED",
                "progress": 100,
                "record_count": 1
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches/s1/results"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [{"sourceip": "10.0.0.1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = run_search(&client, "SELECT sourceip FROM events", &options(5))
            .await
            .unwrap();

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["events"][0]["sourceip"], "10.0.0.1");
    }

    #[tokio::test]
    async fn test_run_search_reports_failed_search() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_id": "s1",
                "status": "ERROR",
                "error_messages": [{
                    "code": "1005",
                    "description": "Invalid AQL",
                    "severity": "ERROR"
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = run_search(&client, "SELEKT", &options(5)).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ERROR"), "{message}");
        assert!(message.contains("Invalid AQL"), "{message}");
    }

    #[tokio::test]
    async fn test_run_search_cancels_after_poll_budget() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_id": "s1",
                "status": "EXECUTE",
                "progress": 10
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/ariel/searches/s1"))
            .and(body_string("status=CANCELED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_id": "s1",
                "status": "CANCELED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = run_search(&client, "SELECT * FROM events", &options(2))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("did not finish after 2 status checks"));
    }

    #[tokio::test]
    async fn test_run_search_rejected_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ariel/searches"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "code": 2000,
                "message": "Query has a syntax error"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = run_search(&client, "SELEKT", &options(5)).await.unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Create search failed with 422"), "{message}");
        assert!(message.contains("syntax error"), "{message}");
    }

    #[tokio::test]
    async fn test_execute_maps_commands() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/databases/flows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"columns": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/ariel/searches/s1"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "search_id": "s1",
                "status": "COMPLETED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let database = execute(
            &client,
            Command::Database {
                name: "flows".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(database.is_success());

        let deleted = execute(&client, Command::Delete { id: "s1".to_string() })
            .await
            .unwrap();
        assert_eq!(deleted.status.as_u16(), 202);
    }

    #[tokio::test]
    async fn test_execute_returns_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches"))
            .and(query_param("data_lake", "\"qcdl\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = execute(&client, Command::Searches).await.unwrap();
        assert_eq!(response.status.as_u16(), 403);
        assert!(ensure_success(response, "Get searches").is_err());
    }
}
