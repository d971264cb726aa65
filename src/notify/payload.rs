use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;

use crate::config::NotifierConfig;
use crate::risk::types::RiskLevel;

/// A Bark push request, independent of how it is transported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub device_key: String,
    pub title: String,
    pub body: String,
    pub group: String,
    pub sound: String,
    pub level: String,
    pub badge: u32,
    /// `"1"` asks the provider to ring the device.
    pub call: String,
}

impl PushPayload {
    pub fn alert(
        config: &NotifierConfig,
        key: &str,
        message: &str,
        risk: RiskLevel,
        voice: bool,
    ) -> Self {
        let (title, sound, level, call) = match risk {
            RiskLevel::Standard => (config.title.clone(), "minuet", "active", false),
            RiskLevel::High => (format!("{} - HIGH RISK", config.title), "alarm", "critical", voice),
        };
        Self {
            device_key: key.to_string(),
            title,
            body: message.to_string(),
            group: config.group.clone(),
            sound: sound.to_string(),
            level: level.to_string(),
            badge: 1,
            call: if call { "1" } else { "0" }.to_string(),
        }
    }

    pub fn heartbeat(config: &NotifierConfig, key: &str, message: &str) -> Self {
        Self {
            device_key: key.to_string(),
            title: format!("{} - heartbeat", config.title),
            body: message.to_string(),
            group: format!("{}-heartbeat", config.group),
            sound: "bell".to_string(),
            level: "active".to_string(),
            badge: 1,
            call: "0".to_string(),
        }
    }
}

/// Characters escaped inside one path segment. Control characters are
/// included so multi-line bodies keep their line breaks.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Equivalent encodings of one push, tried in order until one is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    /// `POST {server}/push` with a JSON body.
    JsonPost,
    /// `GET {server}/{key}/{title}/{body}` with urgency in the query string.
    PathGet,
    /// `GET {server}/{key}/{body}`, no metadata at all.
    MinimalGet,
}

impl DeliveryStrategy {
    pub const CASCADE: [DeliveryStrategy; 3] = [Self::JsonPost, Self::PathGet, Self::MinimalGet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonPost => "json_post",
            Self::PathGet => "path_get",
            Self::MinimalGet => "minimal_get",
        }
    }

    pub fn url(&self, server: &Url, payload: &PushPayload) -> eyre::Result<Url> {
        if server.cannot_be_a_base() {
            return Err(eyre::eyre!("Push server URL '{}' cannot take a path", server));
        }
        let segments: Vec<&str> = match self {
            Self::JsonPost => vec!["push"],
            Self::PathGet => vec![
                payload.device_key.as_str(),
                payload.title.as_str(),
                payload.body.as_str(),
            ],
            Self::MinimalGet => vec![payload.device_key.as_str(), payload.body.as_str()],
        };
        let encoded: Vec<String> = segments
            .into_iter()
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();

        let mut url = server.clone();
        url.set_path(&format!(
            "{}/{}",
            server.path().trim_end_matches('/'),
            encoded.join("/")
        ));

        if *self == Self::PathGet {
            url.query_pairs_mut()
                .append_pair("group", &payload.group)
                .append_pair("sound", &payload.sound)
                .append_pair("level", &payload.level)
                .append_pair("badge", &payload.badge.to_string())
                .append_pair("call", &payload.call);
        }
        Ok(url)
    }

    pub fn request(
        &self,
        client: &Client,
        server: &Url,
        payload: &PushPayload,
    ) -> eyre::Result<RequestBuilder> {
        let url = self.url(server, payload)?;
        Ok(match self {
            Self::JsonPost => client.post(url).json(payload),
            Self::PathGet | Self::MinimalGet => client.get(url),
        })
    }
}
