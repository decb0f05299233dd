use std::path::Path;

use crate::error::{GridcastError, GridcastResult};

/// The fixed answer returned to every client. Not a negotiated session
/// description: a real exchange would need an offer/answer state machine
/// against the worker process, which this control plane does not have.
pub const PLACEHOLDER_ANSWER_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=GStreamer WebRTC\r\nt=0 0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\nc=IN IP4 0.0.0.0\r\na=rtcp:9 IN IP4 0.0.0.0\r\na=ice-ufrag:dummy\r\na=ice-pwd:dummy\r\na=fingerprint:sha-256 DUMMY\r\na=setup:actpass\r\na=mid:video0\r\na=sendonly\r\na=rtpmap:96 H264/90000\r\na=ssrc:1 cname:stream\r\n";

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SdpMessage {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: String,
}

pub fn placeholder_answer() -> SdpMessage {
    SdpMessage {
        sdp: PLACEHOLDER_ANSWER_SDP.to_string(),
        kind: "answer".to_string(),
    }
}

/// Persist the client's offer where the worker expects to find it.
pub fn store_offer(path: &Path, sdp: &str) -> GridcastResult<()> {
    std::fs::write(path, sdp).map_err(|e| {
        GridcastError::signaling(format!("failed to write offer '{}': {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_answer_is_an_answer() {
        let answer = placeholder_answer();
        assert_eq!(answer.kind, "answer");
        assert!(answer.sdp.starts_with("v=0"));
    }

    #[test]
    fn answer_serializes_with_type_field() {
        let json = serde_json::to_value(placeholder_answer()).unwrap();
        assert_eq!(json["type"], "answer");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn store_offer_writes_the_sdp_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_offer.sdp");
        store_offer(&path, "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n"
        );
    }

    #[test]
    fn store_offer_reports_unwritable_path() {
        let err = store_offer(Path::new("/nonexistent/dir/offer.sdp"), "v=0").unwrap_err();
        assert!(matches!(err, GridcastError::Signaling(_)));
    }
}
