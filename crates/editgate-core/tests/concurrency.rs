use editgate_core::prelude::*;
use editgate_test_utils::{init_tracing, manual_engine, numbered_lines, TempWorkspace};
use futures::future::join_all;
use std::sync::Arc;

const RACERS: usize = 16;

fn delete_line(path: &std::path::Path, line: usize) -> ProposeRequest {
    ProposeRequest::new(
        path,
        Mutation::DeleteLineRange {
            start_line: line,
            end_line: line,
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_applies_have_exactly_one_winner() {
    init_tracing();
    let ws = TempWorkspace::new();
    let path = ws.write("race.txt", numbered_lines(5));
    let (engine, _clock) = manual_engine();

    let proposal = engine.propose(delete_line(&path, 1)).await.unwrap();
    let token = proposal.token.clone();

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let token = token.clone();
            tokio::spawn(async move { engine.apply(&token, None).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Expired),
            "unexpected loser error: {err}"
        );
    }

    // applied once: exactly one line gone
    assert_eq!(ws.read(&path).unwrap(), "line 2\nline 3\nline 4\nline 5\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancel_and_apply_race() {
    let ws = TempWorkspace::new();
    let path = ws.write("mixed.txt", numbered_lines(3));
    let (engine, _clock) = manual_engine();

    let proposal = engine.propose(delete_line(&path, 2)).await.unwrap();
    let token = proposal.token.clone();

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let engine = Arc::clone(&engine);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.apply(&token, None).await.map(|_| ())
            } else {
                engine.cancel(&token)
            }
        }));
    }

    let outcomes: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);

    let content = ws.read(&path).unwrap();
    assert!(
        content == numbered_lines(3) || content == "line 1\nline 3\n",
        "file must be untouched or fully applied, got {content:?}"
    );
    assert!(engine.list_pending().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_tokens_do_not_interfere() {
    let ws = TempWorkspace::new();
    let (engine, _clock) = manual_engine();

    let mut tokens = Vec::new();
    for i in 0..8 {
        let path = ws.write(&format!("file-{i}.txt"), numbered_lines(4));
        let proposal = engine.propose(delete_line(&path, 4)).await.unwrap();
        tokens.push((path, proposal.token));
    }

    let handles: Vec<_> = tokens
        .iter()
        .map(|(_, token)| {
            let engine = Arc::clone(&engine);
            let token = token.clone();
            tokio::spawn(async move { engine.apply(&token, None).await })
        })
        .collect();
    for joined in join_all(handles).await {
        assert!(joined.unwrap().unwrap().success);
    }

    for (path, _) in &tokens {
        assert_eq!(ws.read(path).unwrap(), numbered_lines(3));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_proposals_get_unique_tokens() {
    let ws = TempWorkspace::new();
    let path = ws.write("shared.txt", numbered_lines(2));
    let (engine, _clock) = manual_engine();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let path = path.clone();
            tokio::spawn(async move { engine.propose(delete_line(&path, 1)).await })
        })
        .collect();

    let mut tokens: Vec<ProposalToken> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().token)
        .collect();
    tokens.sort();
    tokens.dedup();
    assert_eq!(tokens.len(), 32);
    assert_eq!(engine.list_pending().len(), 32);
}
