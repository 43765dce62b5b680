use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::alignment("x")
            .to_string()
            .contains("alignment error:")
    );
    assert!(
        ReelError::synthesis("x")
            .to_string()
            .contains("synthesis error:")
    );
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn missing_asset_reports_checked_path() {
    let err = ReelError::missing_asset("background video", "/srv/content/bg.mp4");
    let msg = err.to_string();
    assert!(msg.contains("background video"));
    assert!(msg.contains("/srv/content/bg.mp4"));
}

#[test]
fn render_error_keeps_full_diagnostics_but_public_message_summarizes() {
    let err = ReelError::render(
        "exit status: 1",
        "Input #0, from '/tmp/secret/in.mp4':\n[AVFilterGraph] No such filter: 'bogus'\n",
    );
    assert!(err.to_string().contains("/tmp/secret/in.mp4"));

    let public = err.public_message();
    assert!(public.contains("No such filter"));
    assert!(!public.contains("/tmp/secret"));
}

#[test]
fn other_preserves_source_but_is_hidden_publicly() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.public_message(), "internal server error");
}

#[test]
fn client_errors_are_classified() {
    assert!(ReelError::validation("x").is_client_error());
    assert!(!ReelError::synthesis("x").is_client_error());
    assert!(!ReelError::render("1", "").is_client_error());
}
