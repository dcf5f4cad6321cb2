//! # Integration Tests
//!
//! Cross-crate tests driven entirely by in-memory collaborators.
//!
//! Covers:
//! - Config file -> session wiring
//! - Sign-up -> snapshot -> real-time replay -> filtered view
//! - Provisioning rollback under a failing backend

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use account::{AuthSession, MockAuthService, Provisioner};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        Coordinate, DirectoryBackend, DirectoryEntry, EventKind, RealtimeMessage,
        SessionConfig,
    };
    use directory_sync::{DirectorySession, DirectoryState, MockConfig, MockDirectoryBackend, MockOp};
    use tokio::sync::{mpsc, oneshot, watch};

    const CONFIG: &str = r#"
[backend]
endpoint = "https://example.test/v1"
project_id = "orbit"
database_id = "db"

[proximity]
radius_meters = 5000.0

[retry]
max_attempts = 2
"#;

    const CALGARY: Coordinate = Coordinate {
        latitude: 51.0447,
        longitude: -114.0719,
    };

    fn config() -> SessionConfig {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    fn neighbour(account: &str, name: &str, interests: &[&str]) -> DirectoryEntry {
        DirectoryEntry::new("", account, name)
            .with_interests(interests.iter().copied())
            .with_coordinate(Coordinate::new(51.05, -114.07))
    }

    /// Wait until the published state satisfies `predicate`
    async fn wait_for<F>(rx: &mut watch::Receiver<Arc<DirectoryState>>, predicate: F) -> Arc<DirectoryState>
    where
        F: Fn(&DirectoryState) -> bool,
    {
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let state = rx.borrow_and_update().clone();
                if predicate(&*state) {
                    return state;
                }
                rx.changed().await.unwrap();
            }
        })
        .await;
        assert!(result.is_ok(), "state never reached the expected shape");
        result.unwrap()
    }

    /// End-to-end: sign-up -> snapshot -> live changes from other clients -> view
    #[tokio::test]
    async fn test_e2e_directory_session() {
        let config = config();
        let backend = MockDirectoryBackend::with_config(MockConfig {
            channel: Some(config.realtime_channel()),
            ..Default::default()
        });
        backend.seed([
            neighbour("acc-bo", "Bo", &["go", "chess"]),
            DirectoryEntry::new("", "acc-far", "Far").with_coordinate(Coordinate::new(49.28, -123.12)),
        ]);

        let auth = MockAuthService::new();
        let directory = Arc::new(DirectorySession::new(Arc::new(backend.clone()), &config));
        let auth_session = Arc::new(AuthSession::new(Arc::new(auth.clone())));
        let provisioner = Provisioner::new(
            Arc::clone(&auth_session),
            Arc::clone(&directory),
            config.retry.clone(),
        );

        assert_eq!(directory.initialize().await.unwrap(), 2);

        let provisioned = provisioner
            .sign_up("Ada", "ada@example.test", "pw")
            .await
            .unwrap();
        assert!(auth_session.state().logged_in);

        // Live wiring: backend writes feed the session
        let realtime_rx = backend.subscribe(config.realtime.event_buffer);
        let (location_tx, location_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let runner = {
            let directory = Arc::clone(&directory);
            tokio::spawn(async move {
                directory
                    .run(realtime_rx, location_rx, async {
                        let _ = stop_rx.await;
                    })
                    .await
            })
        };

        let mut state_rx = directory.subscribe();
        location_tx.send(CALGARY).await.unwrap();
        let state = wait_for(&mut state_rx, |s| s.visible.len() == 1).await;
        assert_eq!(state.visible[0].name, "Bo");
        assert_eq!(
            state.current_user.as_ref().map(|e| e.id.clone()),
            Some(provisioned.entry.id.clone())
        );

        // Another client joins nearby
        let cy = backend
            .create_user(&neighbour("acc-cy", "Cy", &["rust"]))
            .await
            .unwrap();
        wait_for(&mut state_rx, |s| s.visible.len() == 2).await;

        // Filter inputs apply to live data
        directory.toggle_interest("rust").await;
        let names: Vec<_> = directory.view().await.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Cy"]);
        directory.toggle_interest("rust").await;

        // Another client leaves
        backend.delete_user(&cy.id).await.unwrap();
        let state = wait_for(&mut state_rx, |s| s.visible.len() == 1).await;
        assert_eq!(
            state.all_interests,
            vec!["chess".to_string(), "go".to_string()]
        );

        let _ = stop_tx.send(());
        let stats = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.location_fixes, 1);
        assert_eq!(stats.messages_rejected, 0);

        // The location fix was written through to the backend
        let stored = backend
            .get_user(&provisioned.account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.coordinate(), Some(CALGARY));
    }

    /// A failing backend rolls the new account back
    #[tokio::test]
    async fn test_e2e_sign_up_rollback() {
        let config = config();
        let backend = MockDirectoryBackend::new();
        backend.fail_always(MockOp::Create);

        let auth = MockAuthService::new();
        let directory = Arc::new(DirectorySession::new(Arc::new(backend.clone()), &config));
        let provisioner = Provisioner::new(
            Arc::new(AuthSession::new(Arc::new(auth.clone()))),
            Arc::clone(&directory),
            config.retry.clone(),
        );

        let err = provisioner
            .sign_up("Ada", "ada@example.test", "pw")
            .await
            .unwrap_err();
        assert!(err.is_retry_exhausted());
        assert_eq!(backend.call_count(MockOp::Create), 2);
        assert!(auth.accounts().is_empty());
        assert!(directory.state().entries.is_empty());

        // Backend recovers; the same email can register again
        backend.heal(MockOp::Create);
        provisioner
            .sign_up("Ada", "ada@example.test", "pw")
            .await
            .unwrap();
        assert_eq!(auth.accounts().len(), 1);
        assert_eq!(backend.documents().len(), 1);
    }

    /// Undecodable messages are counted and skipped
    #[tokio::test]
    async fn test_e2e_bad_messages_are_skipped() {
        let config = config();
        let backend = MockDirectoryBackend::with_entries([neighbour("acc-bo", "Bo", &[])]);
        let directory = DirectorySession::new(Arc::new(backend), &config);
        directory.initialize().await.unwrap();
        directory.update_current_location(CALGARY).await.unwrap();

        let cy = DirectoryEntry::new("d-cy", "acc-cy", "Cy").with_coordinate(Coordinate::new(51.05, -114.07));
        let good = RealtimeMessage::for_entry(EventKind::Create, &config.realtime_channel(), &cy).unwrap();
        let mut bad = good.clone();
        bad.payload = Default::default();

        let (realtime_tx, realtime_rx) = mpsc::channel(4);
        let (location_tx, location_rx) = mpsc::channel::<Coordinate>(1);
        realtime_tx.send(bad).await.unwrap();
        realtime_tx.send(good).await.unwrap();
        drop(realtime_tx);
        drop(location_tx);

        let stats = directory
            .run(realtime_rx, location_rx, std::future::pending())
            .await;
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.messages_rejected, 1);

        let names: Vec<_> = directory.view().await.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Bo", "Cy"]);
        assert!(directory.state().last_error.is_none());
        assert_eq!(directory.metrics_summary().await.decode_failures, 1);
    }
}
