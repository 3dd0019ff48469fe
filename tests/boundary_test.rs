use mod_release::boundary::BoundaryWarning;
use mod_release::ui;
use std::path::PathBuf;

// ============================================================================
// BoundaryWarning Display Tests
// ============================================================================

#[test]
fn test_malformed_log_line_display() {
    let warning = BoundaryWarning::MalformedLogLine {
        line: "only || three || fields".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("malformed log line"),
        "Message should mention the malformed line, got: {}",
        display_msg
    );
    assert!(display_msg.contains("only || three || fields"));
}

#[test]
fn test_unparsable_timestamp_display() {
    let warning = BoundaryWarning::UnparsableTimestamp {
        hash: "abc1234def5678".to_string(),
        timestamp: "yesterday".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("abc1234") && !display_msg.contains("abc1234d"),
        "Message should contain the shortened hash, got: {}",
        display_msg
    );
    assert!(display_msg.contains("'yesterday'"));
}

#[test]
fn test_unparsable_timestamp_short_hash_kept() {
    let warning = BoundaryWarning::UnparsableTimestamp {
        hash: "abc".to_string(),
        timestamp: "".to_string(),
    };
    assert!(warning.to_string().contains("commit abc:"));
}

#[test]
fn test_unreadable_store_display() {
    let warning = BoundaryWarning::UnreadableNoteStore {
        path: PathBuf::from("/mods/changenotes.json"),
        reason: "expected value at line 1 column 1".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(display_msg.contains("/mods/changenotes.json"));
    assert!(display_msg.contains("expected value"));
    assert!(display_msg.contains("empty list"));
}

#[test]
fn test_unreadable_descriptor_display() {
    let warning = BoundaryWarning::UnreadableDescriptor {
        path: PathBuf::from("Source/ModConfig.json"),
        reason: "No such file or directory".to_string(),
    };
    let display_msg = warning.to_string();
    assert!(display_msg.contains("Source/ModConfig.json"));
    assert!(display_msg.contains("creating a new one"));
}

#[test]
fn test_missing_template_and_no_tag_display() {
    let warning = BoundaryWarning::MissingTemplate {
        path: PathBuf::from("Source/Footer.md"),
    };
    assert!(warning.to_string().contains("Source/Footer.md"));
    assert!(warning.to_string().contains("section omitted"));

    assert!(BoundaryWarning::NoReleaseTag
        .to_string()
        .contains("full history"));
}

#[test]
fn test_missing_published_file_id_display() {
    let warning = BoundaryWarning::MissingPublishedFileId {
        path: PathBuf::from("About/PublishedFileId.txt"),
        reason: "No such file or directory".to_string(),
    };
    let display_msg = warning.to_string();
    assert!(display_msg.contains("About/PublishedFileId.txt"));
    assert!(display_msg.contains("new item"));
}

// ============================================================================
// Display Functions (Visual Verification)
// ============================================================================

#[test]
fn test_display_boundary_warning() {
    let warnings = vec![
        BoundaryWarning::NoReleaseTag,
        BoundaryWarning::MissingTemplate {
            path: PathBuf::from("Source/Version.md"),
        },
    ];

    for warning in warnings {
        ui::display_boundary_warning(&warning);
    }
}
