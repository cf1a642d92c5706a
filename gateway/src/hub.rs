use std::time::Duration;

use thiserror::Error;

use wiser_common::{HubSettings, HubSnapshot};

const DOMAIN_PATH: &str = "/data/domain/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct HubClient {
    base_url: String,
    secret: String,
    client: reqwest::Client,
    snapshot: Option<HubSnapshot>,
}

impl HubClient {
    pub fn new(settings: &HubSettings) -> Result<Self, HubError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: settings.base_url(),
            secret: settings.secret.clone(),
            client,
            snapshot: None,
        })
    }

    pub fn snapshot(&self) -> Option<&HubSnapshot> {
        self.snapshot.as_ref()
    }

    pub async fn refresh(&mut self) -> Result<&HubSnapshot, HubError> {
        let snapshot: HubSnapshot = self
            .client
            .get(format!("{}{DOMAIN_PATH}", self.base_url))
            .header("SECRET", &self.secret)
            .header("Content-Type", "application/json;charset=UTF-8")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(self.snapshot.insert(snapshot))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DOMAIN_BODY: &str = r#"{
        "HeatingChannel": [{"id": 1, "HeatingRelayState": "On"}],
        "HotWater": [{"id": 2, "HotWaterRelayState": "Off"}],
        "Room": [{"id": 1, "Name": "Hall", "CalculatedTemperature": 185,
                  "RoomStatId": 7, "ControlOutputState": "On"}],
        "Device": [{"id": 7, "ProductType": "RoomStat", "BatteryVoltage": 30, "BatteryLevel": "Normal"}]
    }"#;

    fn settings(url: String) -> HubSettings {
        HubSettings {
            address: url,
            secret: "hub-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn refresh_sends_secret_and_caches_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/domain/")
            .match_header("SECRET", "hub-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DOMAIN_BODY)
            .create_async()
            .await;

        let mut hub = HubClient::new(&settings(server.url())).unwrap();
        assert!(hub.snapshot().is_none());

        let snapshot = hub.refresh().await.unwrap();
        assert_eq!(snapshot.rooms[0].name, "Hall");
        assert_eq!(snapshot.rooms[0].room_stat_id, Some(7));
        assert!(hub.snapshot().is_some());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_secret_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/data/domain/")
            .with_status(401)
            .create_async()
            .await;

        let mut hub = HubClient::new(&settings(server.url())).unwrap();
        assert!(matches!(hub.refresh().await, Err(HubError::Http(_))));
        assert!(hub.snapshot().is_none());
    }
}
