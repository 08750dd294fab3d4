// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! A sign-up form driven from a script of user edits.
//!
//! Run with `RUST_LOG=formstate=debug cargo run --example signup` to see the engine's logs.

use formstate::{FormConfig, FormOptions, FormState};
use futures::{executor::LocalPool, future};
use serde_json::{Value, json};
use std::{error::Error, rc::Rc};
use tracing_subscriber::EnvFilter;

fn check(values: Rc<Value>) -> future::Ready<Result<bool, &'static str>> {
    let user = &values["user"];
    let email_ok = user["email"].as_str().is_some_and(|e| e.contains('@'));
    let name_ok = user["name"].as_str().is_some_and(|n| !n.trim().is_empty());
    let members_ok = values["members"]
        .as_array()
        .is_some_and(|members| members.iter().all(|m| m["role"].is_string()));
    future::ready(Ok(email_ok && name_ok && members_ok))
}

fn report(label: &str, state: &FormState) {
    let dirty: Vec<String> = state
        .dirty_fields
        .iter()
        .filter(|(_, dirty)| **dirty)
        .map(|(path, _)| path.to_string())
        .collect();
    println!(
        "{label:<28} valid={:<5} validating={:<5} dirty={dirty:?}",
        state.is_valid, state.is_validating
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = FormConfig::from_json(
        r#"{ "initialIsValid": false, "arrayIdentity": { "members": "id" } }"#,
    )?;
    let mut pool = LocalPool::new();
    let form = FormOptions::new(pool.spawner())
        .config(config)
        .initial_values(json!({
            "user": { "name": "", "email": "" },
            "members": [
                { "id": "m1", "role": "owner" },
                { "id": "m2", "role": "viewer" },
            ],
        }))
        .validate(check)
        .on_submit(|values: Rc<Value>| {
            println!("submitted: {values}");
            future::ready(Ok::<_, &'static str>(()))
        })
        .build()?;

    let _log = form.subscribe_selector(
        |state| state.is_submitting,
        |submitting| println!("is_submitting -> {submitting}"),
    );

    pool.run_until_stalled();
    report("initial", &form.get_state());

    form.update_field("user.name", "Ada")?;
    form.update_field("user.email", "ada@example.com")?;
    pool.run_until_stalled();
    report("after typing", &form.get_state());

    form.update_values(
        |draft| {
            if let Some(Value::Array(members)) = draft.get_mut("members") {
                members.reverse();
            }
            Ok(())
        },
        true,
    )?;
    pool.run_until_stalled();
    report("after reordering members", &form.get_state());

    form.update_field("members.0.role", "editor")?;
    pool.run_until_stalled();
    report("after changing a role", &form.get_state());

    form.update_field("members.0.role", "viewer")?;
    pool.run_until_stalled();
    report("after restoring the role", &form.get_state());

    pool.run_until(form.submit())?;

    form.reset(Value::clone(&form.get_state().values))?;
    report("after reset", &form.get_state());
    Ok(())
}
