use anyhow::Context;
use chrono::Local;
use engine_logging::{engine_error, engine_info, engine_warn};
use harvester_core::{HarvestReport, Termination};
use harvester_engine::{authenticate, write_link_list, ApiClient, Harvester};

use crate::config::RunConfig;
use crate::prompt::{self, RunInputs};

/// Prompts for anything still missing, then hands over to [`run_with`].
pub async fn run(mut config: RunConfig) -> anyhow::Result<()> {
    let inputs = prompt::complete(&mut config).context("failed to read interactive input")?;
    run_with(inputs, &config).await
}

/// Authenticate, harvest, then write the dated links file.
///
/// Authentication failures end the run with an error and no output file.
/// Harvest problems only shorten the result. An empty result writes nothing.
pub async fn run_with(inputs: RunInputs, config: &RunConfig) -> anyhow::Result<()> {
    let client = ApiClient::new(&inputs.api_url, &config.client)
        .with_context(|| format!("cannot use api url {:?}", inputs.api_url))?;

    let session = match authenticate(client, inputs.credentials).await {
        Ok(session) => session,
        Err(err) => {
            engine_error!("login failed: {}", err);
            return Err(err).context("login failed");
        }
    };

    let report = Harvester::new(config.harvest).run(&session).await;
    log_termination(&report);

    if report.is_empty() {
        engine_info!("no external links found");
        return Ok(());
    }

    let today = Local::now().date_naive();
    write_link_list(&config.output_dir, today, &report.links)
        .with_context(|| format!("failed to save links to {:?}", config.output_dir))?;

    engine_info!("done!");
    Ok(())
}

fn log_termination(report: &HarvestReport) {
    match &report.termination {
        Some(Termination::Exhausted) => {
            engine_info!("walked the whole corpus in {} batches", report.cycles);
        }
        Some(Termination::PermissionDenied { .. }) => {
            engine_warn!("harvest stopped early: read access denied; keeping partial results");
        }
        Some(Termination::ApiError { code, .. }) => {
            engine_warn!("harvest stopped early on api error {}; keeping partial results", code);
        }
        Some(Termination::RetriesExhausted {
            attempts,
            last_error,
        }) => {
            engine_warn!(
                "harvest stopped after {} failed attempts ({}); keeping partial results",
                attempts,
                last_error
            );
        }
        None => engine_warn!("harvest ended without reaching a terminal state"),
    }
    if report.failed_cycles > 0 {
        engine_info!("{} batch requests had to be retried", report.failed_cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use engine_logging::LogDestination;
    use harvester_core::HarvestSettings;
    use harvester_engine::{ClientSettings, Credentials};
    use log::LevelFilter;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(output_dir: &Path) -> RunConfig {
        RunConfig {
            api_url: None,
            username: None,
            password: None,
            harvest: HarvestSettings::with_delay(Duration::ZERO),
            client: ClientSettings::default(),
            output_dir: output_dir.to_path_buf(),
            log_destination: LogDestination::Terminal,
            log_level: LevelFilter::Info,
        }
    }

    fn inputs_for(server: &MockServer, password: &str) -> RunInputs {
        RunInputs {
            api_url: format!("{}/w/api.php", server.uri()),
            credentials: Credentials::new("bot", password),
        }
    }

    async fn mount_login(server: &MockServer, result: &str) {
        Mock::given(method("GET"))
            .and(query_param("meta", "tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"tokens": {"logintoken": "TOK1"}}
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"login": {"result": result}})),
            )
            .mount(server)
            .await;
    }

    fn entries(dir: &Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(read) => read
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn rejected_login_fails_without_writing() {
        let server = MockServer::start().await;
        mount_login(&server, "WrongPass").await;
        Mock::given(method("GET"))
            .and(query_param("generator", "allpages"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();

        let err = run_with(inputs_for(&server, "bad"), &config_for(temp.path()))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("WrongPass"), "{err:#}");
        assert!(entries(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_harvest_succeeds_without_writing() {
        let server = MockServer::start().await;
        mount_login(&server, "Success").await;
        Mock::given(method("GET"))
            .and(query_param("generator", "allpages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "batchcomplete": "",
                "query": {"pages": {"1": {"pageid": 1, "title": "Quiet page"}}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let output_dir = temp.path().join("out");

        run_with(inputs_for(&server, "pw"), &config_for(&output_dir))
            .await
            .unwrap();

        assert!(entries(&output_dir)
            .iter()
            .all(|name| !name.starts_with("links_")));
    }
}
