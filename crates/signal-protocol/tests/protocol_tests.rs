//! Protocol layer tests — identity disclosure, envelope classification,
//! and the sender stamp applied before delivery.

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use signal_protocol::*;

    fn parse(value: Value) -> Result<SignalEnvelope, EnvelopeError> {
        SignalEnvelope::parse(value.to_string().as_bytes())
    }

    // ─────────────────────────────────────────────────────────────────────
    // PeerId / IdentityAssignment
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn minted_identities_are_distinct() {
        let ids: std::collections::HashSet<PeerId> = (0..1000).map(|_| PeerId::mint()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn peer_id_serializes_as_plain_string() {
        let id = PeerId::from("abc-123");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc-123"));
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn identity_assignment_wire_format() {
        let assignment = IdentityAssignment::new(PeerId::from("A1"));
        let wire: Value = serde_json::from_str(&assignment.to_json().unwrap()).unwrap();
        assert_eq!(wire, json!({"userId": "A1"}));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Classification
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn sdp_envelope_is_recognized() {
        let envelope = parse(json!({
            "signalType": "sdp",
            "userId": "B1",
            "sdp_base64": "xyz",
        }))
        .unwrap();

        assert_eq!(envelope.kind(), SignalKind::Sdp);
        assert_eq!(envelope.user_id().as_str(), "B1");
        match envelope {
            SignalEnvelope::Sdp(signal) => {
                assert_eq!(signal.sdp, "xyz");
                assert!(signal.extra.is_empty());
            }
            other => panic!("expected sdp, got {other:?}"),
        }
    }

    #[test]
    fn legacy_sdp_field_is_accepted() {
        let envelope = parse(json!({"signalType": "sdp", "userId": "B1", "sdp": "xyz"})).unwrap();
        let wire: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(wire["sdp_base64"], "xyz");
        assert!(wire.get("sdp").is_none());
    }

    #[test]
    fn candidate_envelope_is_recognized() {
        let envelope = parse(json!({
            "signalType": "candidate",
            "userId": "B1",
            "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host",
        }))
        .unwrap();
        assert_eq!(envelope.kind(), SignalKind::Candidate);
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = SignalEnvelope::parse(b"{not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }

    #[test]
    fn missing_tag_is_rejected() {
        let err = parse(json!({"userId": "B1", "sdp_base64": "xyz"})).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingSignalType));

        let err = parse(json!(["sdp", "B1"])).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingSignalType));
    }

    #[test]
    fn superseded_offer_answer_tags_are_unknown() {
        for tag in ["offer", "answer", "SDP", ""] {
            let err = parse(json!({"signalType": tag, "userId": "B1", "sdp": "xyz"})).unwrap_err();
            match err {
                EnvelopeError::UnknownSignalType(found) => assert_eq!(found, tag),
                other => panic!("expected unknown tag for {tag:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_string_tag_is_unknown() {
        let err = parse(json!({"signalType": 7, "userId": "B1"})).unwrap_err();
        assert!(matches!(err, EnvelopeError::UnknownSignalType(ref t) if t == "7"));
    }

    #[test]
    fn known_tag_with_missing_fields_is_invalid_variant() {
        let err = parse(json!({"signalType": "candidate", "userId": "B1"})).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::InvalidVariant { kind: SignalKind::Candidate, .. }
        ));

        let err = parse(json!({"signalType": "sdp", "sdp_base64": "xyz"})).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidVariant { kind: SignalKind::Sdp, .. }));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sender stamp
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn stamp_sender_replaces_user_id_and_returns_target() {
        let mut envelope =
            parse(json!({"signalType": "sdp", "userId": "B1", "sdp_base64": "xyz"})).unwrap();

        let target = envelope.stamp_sender(PeerId::from("A1"));

        assert_eq!(target.as_str(), "B1");
        let wire: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({"signalType": "sdp", "userId": "A1", "sdp_base64": "xyz"})
        );
    }

    #[test]
    fn stamped_envelope_keeps_unknown_fields() {
        let mut envelope = parse(json!({
            "signalType": "candidate",
            "userId": "B1",
            "candidate": "cand",
            "sdpMid": "0",
            "sdpMLineIndex": 0,
        }))
        .unwrap();

        envelope.stamp_sender(PeerId::from("A1"));

        let wire: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({
                "signalType": "candidate",
                "userId": "A1",
                "candidate": "cand",
                "sdpMid": "0",
                "sdpMLineIndex": 0,
            })
        );
    }
}
