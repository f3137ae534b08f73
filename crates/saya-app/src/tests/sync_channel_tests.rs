use std::time::Duration;

use saya_types::{AppEvent, ImportProgress, ImportStage};
use tokio::time::timeout;

fn progress(percent: f32) -> ImportProgress {
    ImportProgress {
        job_id: Default::default(),
        percent,
        stage: ImportStage::TermBanks,
        message: format!("{percent}%"),
    }
}

#[tokio::test]
async fn test_tokio_spawn_from_sync_context() {
    let (tx, rx) = kanal::unbounded_async::<AppEvent>();

    let sync_callback = move || {
        let tx = tx.clone();
        tokio::spawn(async move {
            tx.send(AppEvent::TextInput("test".to_string()))
                .await
                .expect("send failed");
        });
    };

    sync_callback();

    match timeout(Duration::from_secs(2), rx.recv()).await {
        Ok(Ok(AppEvent::TextInput(text))) => assert_eq!(text, "test"),
        Ok(Ok(_)) => panic!("Wrong event type"),
        Ok(Err(e)) => panic!("Channel error: {}", e),
        Err(_) => panic!("Timeout - tokio::spawn from sync context failed!"),
    }
}

#[tokio::test]
async fn test_blocking_progress_sink_reaches_async_receiver() {
    let (tx, rx) = kanal::bounded_async::<AppEvent>(16);
    let sync_tx = tx.clone_sync();

    tokio::task::spawn_blocking(move || {
        for percent in [5.0, 10.0, 50.0] {
            sync_tx
                .try_send(AppEvent::ImportProgress(progress(percent)))
                .unwrap();
        }
    })
    .await
    .unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        match timeout(Duration::from_secs(1), rx.recv()).await {
            Ok(Ok(AppEvent::ImportProgress(p))) => seen.push(p.percent),
            _ => panic!("Expected a progress event"),
        }
    }
    assert_eq!(seen, vec![5.0, 10.0, 50.0]);
}

#[tokio::test]
async fn test_full_channel_drops_progress_without_blocking() {
    let (tx, rx) = kanal::bounded_async::<AppEvent>(1);
    let sync_tx = tx.clone_sync();

    let delivered = tokio::task::spawn_blocking(move || {
        (0..10)
            .filter(|i| {
                matches!(
                    sync_tx.try_send(AppEvent::ImportProgress(progress(*i as f32))),
                    Ok(true)
                )
            })
            .count()
    });
    let delivered = timeout(Duration::from_secs(1), delivered)
        .await
        .unwrap()
        .unwrap();

    assert!(delivered >= 1 && delivered < 10);
    assert!(matches!(rx.recv().await, Ok(AppEvent::ImportProgress(_))));
}

#[tokio::test]
async fn test_multiple_spawned_sends() {
    let (tx, rx) = kanal::unbounded_async::<AppEvent>();

    for i in 0..100 {
        let tx = tx.clone();
        tokio::spawn(async move {
            tx.send(AppEvent::TextInput(format!("msg{}", i)))
                .await
                .expect("send failed");
        });
    }

    let mut count = 0;
    let result = timeout(Duration::from_secs(2), async {
        while count < 100 {
            rx.recv().await.expect("recv failed");
            count += 1;
        }
    })
    .await;

    assert!(result.is_ok(), "Timeout waiting for events!");
    assert_eq!(count, 100);
}
