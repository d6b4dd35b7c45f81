// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt relay round-trips between a helper and a client over the socket.

use std::sync::Arc;

use gvfsd_client::{AskPasswordReply, ChoiceReply, MountOperationDbus, MountSource};
use gvfsd_core::{
    MountOperation, MountSourceRef, OperationState, ScriptedOperation, ScriptedReply,
};

use crate::prelude::*;

#[tokio::test]
async fn ask_password_round_trip() {
    let broker = start_broker(&[]).await;
    let client_conn = broker.connect().await;
    let helper_conn = broker.connect().await;

    let op = ScriptedOperation::new([ScriptedReply::handled(OperationState {
        password: "s3cret".to_string(),
        username: "alice".to_string(),
        domain: "WORKGROUP".to_string(),
        ..OperationState::default()
    })]);
    let relay = MountOperationDbus::wrap(Some(op as Arc<dyn MountOperation>), &client_conn);

    let source = MountSource::new(helper_conn, relay.source());
    let reply = source
        .ask_password("need pw", "alice", "WORKGROUP", 0)
        .await
        .expect("ask_password failed");

    assert_eq!(
        reply,
        AskPasswordReply {
            handled: true,
            aborted: false,
            password: "s3cret".to_string(),
            username: "alice".to_string(),
            domain: "WORKGROUP".to_string(),
            anonymous: false,
            password_save: 0,
        }
    );
}

#[tokio::test]
async fn questions_and_processes_carry_the_choice() {
    let broker = start_broker(&[]).await;
    let client_conn = broker.connect().await;
    let helper_conn = broker.connect().await;

    let op = ScriptedOperation::new([
        ScriptedReply::handled(OperationState {
            choice: 1,
            ..OperationState::default()
        }),
        ScriptedReply::handled(OperationState {
            choice: 0,
            ..OperationState::default()
        }),
    ]);
    let relay = MountOperationDbus::wrap(Some(op as Arc<dyn MountOperation>), &client_conn);
    let source = MountSource::new(helper_conn, relay.source());

    let question = source
        .ask_question("overwrite?", &["yes".to_string(), "no".to_string()])
        .await
        .expect("ask_question failed");
    assert_eq!(
        question,
        ChoiceReply {
            handled: true,
            aborted: false,
            choice: 1
        }
    );

    let processes = source
        .show_processes("volume is busy", &[4242], &["kill".to_string()])
        .await
        .expect("show_processes failed");
    assert!(processes.handled);
    assert_eq!(processes.choice, 0);
}

#[tokio::test]
async fn dummy_source_prompts_resolve_locally() {
    let broker = start_broker(&[]).await;
    let helper_conn = broker.connect().await;

    let source = MountSource::new(helper_conn, MountSourceRef::dummy());

    let reply = source
        .ask_password("pw?", "", "", 0)
        .await
        .expect("ask_password failed");
    assert_eq!(reply, AskPasswordReply::default());

    let choice = source
        .ask_question("q?", &[])
        .await
        .expect("ask_question failed");
    assert!(!choice.handled);
    assert!(!choice.aborted);
    assert_eq!(choice.choice, 0);
}
