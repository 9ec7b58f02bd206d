use std::sync::Arc;
use std::time::Duration;

use super::testing::{
    candidates, record, run, DetailScript, RecordingSnapshots, ScriptedStrategy, SearchScript,
};
use super::*;

fn results_page() -> SearchScript {
    SearchScript::Page("<html><body>results</body></html>".to_string())
}

#[tokio::test]
async fn visits_every_candidate_and_keeps_only_usable_records() {
    let mut strategy = ScriptedStrategy::new("scripted", results_page());
    strategy.candidates = Ok(candidates(&["B001", "B002", "B003", "B004", "B005"]));
    strategy
        .details
        .insert("B001".into(), DetailScript::Record(record("Pedigree 3kg", "649")));
    strategy.details.insert("B002".into(), DetailScript::Empty);
    strategy
        .details
        .insert("B003".into(), DetailScript::Record(record("Drools 10kg", "2199")));
    strategy.details.insert("B004".into(), DetailScript::Fail);
    strategy
        .details
        .insert("B005".into(), DetailScript::Record(record("Whiskas 1.2kg", "399")));
    let calls = strategy.calls();

    let outcome = run_strategy(&mut strategy, &run()).await.unwrap();

    assert_eq!(outcome.status, AcquisitionStatus::Completed);
    let names: Vec<_> = outcome.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Pedigree 3kg", "Drools 10kg", "Whiskas 1.2kg"]);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.visited.len(), 5);
    assert_eq!(calls.releases, 1);
    assert_eq!(calls.finished, vec![outcome.clone()]);
}

#[tokio::test]
async fn candidate_list_is_capped() {
    let mut strategy = ScriptedStrategy::new("scripted", results_page());
    strategy.candidates = Ok(candidates(&["B001", "B002", "B003", "B004"]));
    strategy.limit = 2;
    let calls = strategy.calls();

    run_strategy(&mut strategy, &run()).await.unwrap();

    assert_eq!(calls.lock().unwrap().visited, ["B001", "B002"]);
}

#[tokio::test]
async fn block_mid_loop_keeps_earlier_records_and_stops() {
    let mut strategy = ScriptedStrategy::new("scripted", results_page());
    strategy.candidates = Ok(candidates(&["B001", "B002", "B003"]));
    strategy
        .details
        .insert("B001".into(), DetailScript::Record(record("Pedigree 3kg", "649")));
    strategy.details.insert("B002".into(), DetailScript::Blocked);
    strategy
        .details
        .insert("B003".into(), DetailScript::Record(record("Drools 10kg", "2199")));
    let calls = strategy.calls();

    let outcome = run_strategy(&mut strategy, &run()).await.unwrap();

    assert_eq!(outcome.status, AcquisitionStatus::BlockedMidway);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(calls.lock().unwrap().visited, ["B001", "B002"]);
}

#[tokio::test]
async fn blocked_results_page_is_snapshotted_and_yields_nothing() {
    let snapshots = Arc::new(RecordingSnapshots::default());
    let mut strategy = ScriptedStrategy::new(
        "scripted",
        SearchScript::Page("<title>Robot Check</title>".to_string()),
    )
    .with_snapshots(snapshots.clone());
    strategy.candidates = Ok(candidates(&["B001"]));
    let calls = strategy.calls();

    let outcome = run_strategy(&mut strategy, &run()).await.unwrap();

    assert_eq!(outcome, AcquisitionOutcome::empty(AcquisitionStatus::Blocked));
    assert_eq!(snapshots.names(), ["blocked_search"]);
    assert!(calls.lock().unwrap().visited.is_empty());
}

#[tokio::test]
async fn search_failure_aborts_but_still_releases() {
    let mut strategy = ScriptedStrategy::new(
        "scripted",
        SearchScript::Fail(|| ScraperError::ElementNotFound {
            selector: "#twotabsearchtextbox".to_string(),
        }),
    );
    let calls = strategy.calls();

    let outcome = run_strategy(&mut strategy, &run()).await.unwrap();

    assert_eq!(outcome.status, AcquisitionStatus::Aborted);
    assert!(outcome.records.is_empty());
    assert_eq!(calls.lock().unwrap().releases, 1);
}

#[tokio::test]
async fn blocked_search_error_maps_to_blocked() {
    let mut strategy = ScriptedStrategy::new(
        "scripted",
        SearchScript::Fail(|| ScraperError::Blocked {
            url: "https://www.amazon.in/s?k=dog".to_string(),
            marker: "captcha".to_string(),
        }),
    );

    let outcome = run_strategy(&mut strategy, &run()).await.unwrap();
    assert_eq!(outcome.status, AcquisitionStatus::Blocked);
}

#[tokio::test]
async fn blocked_candidate_collection_maps_to_blocked() {
    let mut strategy = ScriptedStrategy::new("scripted", results_page());
    strategy.candidates = Err(|| ScraperError::Blocked {
        url: "https://www.amazon.in/s?k=dog&page=2".to_string(),
        marker: "robot check".to_string(),
    });

    let outcome = run_strategy(&mut strategy, &run()).await.unwrap();
    assert_eq!(outcome.status, AcquisitionStatus::Blocked);
}

#[tokio::test]
async fn session_acquisition_failure_escapes_after_release() {
    let mut strategy = ScriptedStrategy::new(
        "scripted",
        SearchScript::Fail(|| ScraperError::SessionAcquisition("no chromium".to_string())),
    );
    let calls = strategy.calls();

    let err = run_strategy(&mut strategy, &run()).await.unwrap_err();

    assert!(matches!(err, ScraperError::SessionAcquisition(_)));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.releases, 1);
    assert!(calls.finished.is_empty());
}

#[tokio::test(start_paused = true)]
async fn job_timeout_cancels_and_releases() {
    let mut strategy = ScriptedStrategy::new("scripted", SearchScript::Hang);
    strategy.job_timeout = Some(Duration::from_secs(600));
    let calls = strategy.calls();

    let err = run_strategy(&mut strategy, &run()).await.unwrap_err();

    assert!(matches!(err, ScraperError::Timeout { secs: 600, .. }));
    assert_eq!(calls.lock().unwrap().releases, 1);
}

#[tokio::test]
async fn detail_block_is_snapshotted_by_candidate_id() {
    let snapshots = Arc::new(RecordingSnapshots::default());
    let ctx = super::testing::context(snapshots.clone());
    let candidate = Candidate::new("https://www.amazon.in/", "B0BLOCKED1");
    let page = FetchedPage {
        url: candidate.url.clone(),
        html: "<p>Enter the characters you see below</p>".to_string(),
    };

    let outcome = ctx.inspect_detail(&candidate, &page).await;

    assert_eq!(
        outcome,
        DetailOutcome::Blocked {
            marker: "enter the characters you see below".to_string()
        }
    );
    assert_eq!(snapshots.names(), ["blocked_detail_B0BLOCKED1"]);
}

#[tokio::test]
async fn clean_detail_page_is_extracted() {
    let ctx = super::testing::context(Arc::new(RecordingSnapshots::default()));
    let candidate = Candidate::new("https://www.amazon.in/", "B0CLEAN001");
    let page = FetchedPage {
        url: candidate.url.clone(),
        html: r#"<span id="productTitle">Pedigree Puppy 3 kg</span>
                 <span class="a-price"><span class="a-price-whole">540</span></span>"#
            .to_string(),
    };

    let DetailOutcome::Extracted(Some(record)) = ctx.inspect_detail(&candidate, &page).await else {
        panic!("expected an extracted record");
    };
    assert_eq!(record.name, "Pedigree Puppy 3 kg");
    assert_eq!(record.source_url, candidate.url);
}
