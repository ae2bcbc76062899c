//! The single `/bus` dispatch entry point: fourteen named methods, each
//! reading its own params struct out of the request body and replying with
//! a [`BusResponse`] envelope. A bus method never surfaces a transport
//! error; every failure mode is expressed inside the envelope per the
//! all-keys-succeeded / `errorKey` / fatal `errorText` rules the resolver
//! crate already encodes in its reply types.

use std::sync::Arc;

use serde_json::{Map, Value};
use settingsd_db::Kind;
use settingsd_events::WriteNotice;
use settingsd_resolver::{
    apply_values_op, handle_delete, handle_get, handle_get_desc, handle_reset, handle_reset_desc,
    handle_set, handle_set_desc, handle_set_factory_desc, DeleteRequest, GetRequest, ResetRequest,
    SetRequest, ValuesOp,
};

use settingsd_api_models::{
    BatchOperationParams, BatchParams, BusResponse, DeleteParams, GetDescParams,
    GetSettingsParams, GetValuesParams, RemoveAppParams, ResetDescParams, ResetParams,
    SetDescParams, SetFactoryValueParams, SetSettingsParams, SetValuesParams,
};

use crate::state::ApiState;

/// Dispatch one bus call. `connection_id` is the bus transport's opaque
/// connection identifier, when the transport supplies one; it gates
/// `subscribe` and `notifySelf`.
pub async fn dispatch(state: &ApiState, connection_id: Option<&str>, body: Value) -> BusResponse {
    let Some(method) = body.get("method").and_then(Value::as_str).map(str::to_string) else {
        return BusResponse::fatal("unknown", "missing method");
    };
    let params = body.get("params").cloned().unwrap_or(Value::Object(Map::new()));

    match method.as_str() {
        "getSystemSettings" | "getSystemSettingFactoryValue" | "getCurrentSettings" => {
            get_settings(state, &method, connection_id, params).await
        }
        "setSystemSettings" => set_settings(state, connection_id, params, Kind::Main).await,
        "setSystemSettingFactoryValue" => {
            set_factory_value(state, connection_id, params).await
        }
        "getSystemSettingValues" => get_values(state, params).await,
        "setSystemSettingValues" => set_values(state, connection_id, params).await,
        "getSystemSettingDesc" => get_desc(state, connection_id, params).await,
        "setSystemSettingDesc" => set_desc(state, connection_id, &method, params, false).await,
        "setSystemSettingFactoryDesc" => {
            set_desc(state, connection_id, &method, params, true).await
        }
        "deleteSystemSettings" => delete_settings(state, params).await,
        "resetSystemSettings" => reset_settings(state, connection_id, params).await,
        "resetSystemSettingDesc" => reset_desc(state, params).await,
        "removeApp" => remove_app(state, params).await,
        "batch" => batch(state, connection_id, params).await,
        other => BusResponse::fatal(other, format!("unknown method '{other}'")),
    }
}

/// Resolve the Category-Dim string a request targets: an explicit
/// `category`/`dimension` pair, the device's current dimension for a bare
/// category, or the category the first requested key is already known
/// under.
fn resolve_category(
    state: &ApiState,
    category: Option<&str>,
    dimension: Option<&settingsd_desc::DimensionCoord>,
    keys: &[String],
    app_id: &str,
) -> Option<String> {
    if let Some(category) = category {
        return Some(match dimension {
            Some(coord) => state.desc.build_category_dim(category, coord),
            None => {
                let coord = state.desc.current_dimension(category);
                if coord.is_empty() {
                    category.to_string()
                } else {
                    state.desc.build_category_dim(category, &coord)
                }
            }
        });
    }
    keys.first().and_then(|key| state.desc.category_of(key, app_id))
}

fn resolve_app_id(state: &ApiState, app_id: Option<String>, current_app: Option<bool>) -> String {
    if current_app.unwrap_or(false) {
        return state.app_state.current_app();
    }
    app_id.unwrap_or_default()
}

async fn get_settings(
    state: &ApiState,
    method: &str,
    connection_id: Option<&str>,
    params: Value,
) -> BusResponse {
    let params: GetSettingsParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let keys: Vec<String> = params.keys.clone().unwrap_or_else(|| {
        params.key.clone().map(|key| vec![key]).unwrap_or_default()
    });
    let app_id = resolve_app_id(state, params.app_id, params.current_app);
    let Some(category) =
        resolve_category(state, params.category.as_deref(), params.dimension.as_ref(), &keys, &app_id)
    else {
        return BusResponse::fatal(method, "unable to resolve category for request");
    };

    let db = Arc::clone(&state.db);
    let desc = Arc::clone(&state.desc);
    let volatile = Arc::clone(&state.volatile);
    let keys_for_read = if keys.is_empty() { None } else { Some(keys.clone()) };
    let category_for_read = category.clone();
    let app_for_read = app_id.clone();
    let reply = state
        .task_engine
        .run_read(move || async move {
            handle_get(
                db.as_ref(),
                desc.as_ref(),
                volatile.as_ref(),
                GetRequest { category: &category_for_read, keys: keys_for_read, app_id: &app_for_read },
            )
            .await
        })
        .await;

    let reply = match reply {
        Ok(Ok(reply)) => reply,
        Ok(Err(err)) => return BusResponse::fatal(method, err.to_string()),
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };

    if params.subscribe.unwrap_or(false)
        && let Some(connection_id) = connection_id
    {
        for key in &keys {
            register_value_subscription(state, connection_id, key, &app_id, &category);
        }
    }

    let (bare_category, dimension) = state.desc.split_category_dim(&reply.category);
    let mut response = BusResponse::ok(method);
    response.category = Some(bare_category);
    response.dimension = (!dimension.is_empty()).then_some(dimension);
    response.app_id = Some(reply.app_id);
    response.settings = Some(reply.settings);
    response.subscribed = params.subscribe;
    response
}

fn register_value_subscription(
    state: &ApiState,
    connection_id: &str,
    key: &str,
    app_id: &str,
    category: &str,
) {
    // `category` here is already the resolved Category-Dim string (e.g.
    // `picture$dtv`), so the pinned coordinate is read straight off it
    // rather than re-derived from the device's current dimension state,
    // which may have moved on by the time a later write rebuilds it.
    let (_, dimension) = state.desc.split_category_dim(category);
    let dimension = (!dimension.is_empty()).then_some(dimension);
    let _ = state.events.registry().register(
        connection_id.to_string(),
        settingsd_events::SubscriptionKey {
            kind: settingsd_events::SubscriptionKind::Value,
            key: key.to_string(),
            app_id: if app_id.is_empty() { None } else { Some(app_id.to_string()) },
            category_or_dim: category.to_string(),
        },
        Some(category.to_string()),
        dimension,
    );
}

/// Re-notify every subscriber `notify_early` pinned once a dimension-key
/// write has committed and dimension state has moved on: re-resolve each
/// one's value under the rebuilt coordinate via `request-get-system-settings`
/// and push a fresh message. Subscribers that unregistered mid-write are
/// silently dropped, matching `post_pref_change`'s best-effort delivery.
async fn notify_dimension_rebuild(
    state: &ApiState,
    snapshot: &settingsd_events::PreWriteSnapshot,
    skip_connection: Option<&str>,
) {
    let subscribers = state.events.snapshot_subscribers(snapshot);
    if subscribers.is_empty() {
        return;
    }

    // Re-resolve each subscriber's own category under the now-rebuilt
    // dimension state, rather than re-reading their stale pinned partition:
    // that is what "fresh values under the new coordinate" means.
    let tuples: Vec<settingsd_task::RequestGetSystemSettingsTuple> = subscribers
        .iter()
        .map(|sub| {
            let (bare_category, _) = state.desc.split_category_dim(&sub.key.category_or_dim);
            let coord = state.desc.current_dimension(&bare_category);
            let fresh_category = if coord.is_empty() {
                bare_category
            } else {
                state.desc.build_category_dim(&bare_category, &coord)
            };
            settingsd_task::RequestGetSystemSettingsTuple {
                category: fresh_category,
                app_id: sub.key.app_id.clone().unwrap_or_default(),
                keys: Some(vec![sub.key.key.clone()]),
            }
        })
        .collect();

    let mut replies = Vec::with_capacity(tuples.len());
    let outcome = settingsd_task::request_get_system_settings(
        state.db.as_ref(),
        state.desc.as_ref(),
        state.volatile.as_ref(),
        tuples,
        |tuple, reply| replies.push((tuple.category.clone(), reply.settings.clone())),
    )
    .await;
    if outcome.is_err() {
        return;
    }

    for (sub, (category, settings)) in subscribers.iter().zip(replies) {
        if Some(sub.connection_id.as_str()) == skip_connection {
            continue;
        }
        let (bare_category, dimension) = state.desc.split_category_dim(&category);
        let payload = settingsd_events::NotificationPayload::success(
            Some(bare_category),
            (!dimension.is_empty()).then_some(dimension),
            sub.key.app_id.clone(),
            settings,
        );
        state.notifier.send(&sub.connection_id, &payload).await;
    }
}

/// The Category-Dim partitions a `setSystemSettings` call must write to: a
/// single resolved partition normally, or every partition under a category
/// (cross-product of its declared dimension values) when `setAll` is set.
fn resolve_set_partitions(
    state: &ApiState,
    params: &SetSettingsParams,
    keys: &[String],
    app_id: &str,
) -> Result<Vec<String>, &'static str> {
    if params.set_all.unwrap_or(false) {
        if params.dimension.as_ref().is_some_and(|dim| !dim.is_empty()) {
            return Err("setAll cannot be combined with an explicit dimension");
        }
        let bare_category = params
            .category
            .clone()
            .or_else(|| keys.first().and_then(|key| state.desc.category_of(key, app_id)))
            .ok_or("unable to resolve category for request")?;
        let map = state.desc.category_key_list_map_all(&bare_category, keys);
        if map.is_empty() {
            return Err("no keys declared under the requested category");
        }
        return Ok(map.into_keys().collect());
    }

    resolve_category(state, params.category.as_deref(), params.dimension.as_ref(), keys, app_id)
        .map(|category| vec![category])
        .ok_or("unable to resolve category for request")
}

async fn set_settings(
    state: &ApiState,
    connection_id: Option<&str>,
    params: Value,
    target_kind: Kind,
) -> BusResponse {
    let method = "setSystemSettings";
    let params: SetSettingsParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    if !params.store.unwrap_or(true) {
        return BusResponse::ok(method);
    }
    let keys: Vec<String> = params.settings.keys().cloned().collect();
    let app_id = resolve_app_id(state, params.app_id.clone(), params.current_app);
    let partitions = match resolve_set_partitions(state, &params, &keys, &app_id) {
        Ok(partitions) => partitions,
        Err(err) => return BusResponse::fatal(method, err),
    };

    let notify = params.notify.unwrap_or(true);
    let notify_self = params.notify_self.unwrap_or(true);
    let skip_connection = (!notify_self).then(|| connection_id.unwrap_or_default().to_string());

    let mut return_value = true;
    let mut completed = Vec::new();
    let mut error_key = Vec::new();
    let mut last_bare_category = String::new();
    let mut last_dimension = settingsd_desc::DimensionCoord::new();

    for partition in partitions {
        let snapshot = state.events.notify_early(&partition);

        let db = Arc::clone(&state.db);
        let desc = Arc::clone(&state.desc);
        let volatile = Arc::clone(&state.volatile);
        let values = params.settings.clone();
        let category_for_write = partition.clone();
        let app_for_write = app_id.clone();
        let reply = state
            .task_engine
            .run_write(move || async move {
                handle_set(
                    db.as_ref(),
                    desc.as_ref(),
                    volatile.as_ref(),
                    SetRequest { category: &category_for_write, app_id: &app_for_write, values, target_kind },
                )
                .await
            })
            .await;

        let reply = match reply {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => return BusResponse::fatal(method, err.to_string()),
            Err(err) => return BusResponse::fatal(method, err.to_string()),
        };

        let (bare_category, dimension) = state.desc.split_category_dim(&reply.category);
        let notice_dimension = (!dimension.is_empty()).then_some(dimension.clone());

        // Step 3 of the commit protocol: a dimension-key write moves the
        // device's current coordinate, so the live dimension registry is
        // updated before anyone is told about the change.
        for key in &reply.to_be_notified {
            if state.desc.is_dimension_key(key) {
                if let Some(value) = params.settings.get(key).and_then(Value::as_str) {
                    state.desc.set_current_dimension_value(key, value);
                }
            }
        }
        let dimension_key_written =
            reply.to_be_notified.iter().any(|key| state.desc.is_dimension_key(key));

        if notify && !reply.to_be_notified.is_empty() {
            let notices: Vec<WriteNotice> = reply
                .to_be_notified
                .iter()
                .map(|key| WriteNotice {
                    category: bare_category.clone(),
                    key: key.clone(),
                    value: params.settings.get(key).cloned(),
                    app_id: if app_id.is_empty() { None } else { Some(app_id.clone()) },
                    dimension: notice_dimension.clone(),
                    is_mixed: state.desc.db_type_of(key, &app_id) == Some(settingsd_desc::DbType::M),
                })
                .collect();
            state
                .events
                .post_pref_change(state.notifier.as_ref(), &notices, skip_connection.as_deref())
                .await;

            if dimension_key_written {
                notify_dimension_rebuild(state, &snapshot, skip_connection.as_deref()).await;
            }
        }

        return_value &= reply.errors.is_empty();
        completed.extend(reply.to_be_notified);
        error_key.extend(reply.errors.keys().cloned());
        last_bare_category = bare_category;
        last_dimension = dimension;
    }

    let mut response = BusResponse::ok(method);
    response.return_value = return_value;
    response.category = Some(last_bare_category);
    response.dimension = (!last_dimension.is_empty()).then_some(last_dimension);
    response.app_id = Some(app_id);
    if !error_key.is_empty() {
        response.completed = Some(completed);
        response.error_key = Some(error_key);
    }
    response
}

async fn set_factory_value(
    state: &ApiState,
    connection_id: Option<&str>,
    params: Value,
) -> BusResponse {
    let method = "setSystemSettingFactoryValue";
    let params: SetFactoryValueParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let forwarded = serde_json::json!({
        "settings": params.settings,
        "category": params.category,
        "dimension": params.dimension,
        "app_id": params.app_id,
        "setAll": params.set_all,
        "valueCheck": params.value_check,
    });
    let mut response = set_settings(state, connection_id, forwarded, Kind::Default).await;
    response.method = method.to_string();
    response
}

async fn get_values(state: &ApiState, params: Value) -> BusResponse {
    let method = "getSystemSettingValues";
    let params: GetValuesParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let app_id = params.app_id.unwrap_or_default();
    let Some(item) = state.desc.describe(&params.key, &app_id) else {
        return BusResponse::fatal(method, format!("unknown key '{}'", params.key));
    };

    let mut response = BusResponse::ok(method);
    response.vtype = serde_json::to_value(&item.vtype).ok();
    response.values = serde_json::to_value(&item.vtype).ok();
    response.category = Some(item.category);
    response
}

async fn set_values(state: &ApiState, connection_id: Option<&str>, params: Value) -> BusResponse {
    let method = "setSystemSettingValues";
    let params: SetValuesParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let app_id = String::new();
    let Some(item) = state.desc.describe(&params.key, &app_id) else {
        return BusResponse::fatal(method, format!("unknown key '{}'", params.key));
    };

    let op = match params.op.as_str() {
        "add" => ValuesOp::Add,
        "remove" => ValuesOp::Remove,
        "update" => ValuesOp::Update,
        "set" => ValuesOp::Set,
        other => return BusResponse::fatal(method, format!("unknown op '{other}'")),
    };

    let array_items: Vec<Value> = match &params.values {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let updated = match apply_values_op(&item.vtype, op, &array_items, &[], None) {
        Ok(updated) => updated,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };

    let mut patch = item.clone();
    patch.vtype = updated;
    let _ = (connection_id, params.notify_self);

    let desc = Arc::clone(&state.desc);
    let key = params.key.clone();
    let patch_for_write = patch.clone();
    let write_result = state
        .task_engine
        .run_write(move || async move { handle_set_desc(desc.as_ref(), &key, "", patch_for_write) })
        .await;
    match write_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return BusResponse::fatal(method, err.to_string()),
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    }

    let merged = serde_json::to_value(&patch).unwrap_or(Value::Null);
    state.events.post_desc_change(state.notifier.as_ref(), &params.key, None, merged).await;

    let mut response = BusResponse::ok(method);
    response.category = Some(item.category);
    response
}

async fn get_desc(state: &ApiState, connection_id: Option<&str>, params: Value) -> BusResponse {
    let method = "getSystemSettingDesc";
    let params: GetDescParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let keys: Vec<String> = params.keys.clone().unwrap_or_else(|| {
        params.key.clone().map(|key| vec![key]).unwrap_or_default()
    });
    let app_id = resolve_app_id(state, params.app_id, params.current_app);

    let mut results = Vec::with_capacity(keys.len());
    let mut error_key = Vec::new();
    for key in &keys {
        match handle_get_desc(&state.desc, key, &app_id) {
            Ok(item) => {
                if params.subscribe.unwrap_or(false)
                    && let Some(connection_id) = connection_id
                {
                    let _ = state.events.registry().register(
                        connection_id.to_string(),
                        settingsd_events::SubscriptionKey {
                            kind: settingsd_events::SubscriptionKind::Desc,
                            key: key.clone(),
                            app_id: if app_id.is_empty() { None } else { Some(app_id.clone()) },
                            category_or_dim: String::new(),
                        },
                        None,
                        None,
                    );
                }
                results.push(serde_json::to_value(item).unwrap_or(Value::Null));
            }
            Err(err) => error_key.push(format!("{key}: {err}")),
        }
    }

    let mut response = BusResponse::ok(method);
    response.return_value = error_key.is_empty();
    response.results = Some(results);
    if !error_key.is_empty() {
        response.error_key = Some(error_key);
    }
    response.subscribed = params.subscribe;
    response
}

async fn set_desc(
    state: &ApiState,
    connection_id: Option<&str>,
    method: &str,
    params: Value,
    factory: bool,
) -> BusResponse {
    let params: SetDescParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let app_id = params.app_id.clone().unwrap_or_default();
    let Some(mut patch) = state.desc.describe(&params.key, &app_id) else {
        return BusResponse::fatal(method, format!("unknown key '{}'", params.key));
    };
    if let Some(category) = &params.category {
        patch.category = category.clone();
    }
    if let Some(ui) = &params.ui {
        patch.ui = ui.clone();
    }
    if let Some(vtype) = &params.vtype {
        if let Ok(vtype) = serde_json::from_value(vtype.clone()) {
            patch.vtype = vtype;
        }
    }
    patch.value_check = params.value_check;

    let desc = Arc::clone(&state.desc);
    let key = params.key.clone();
    let app_id_for_write = app_id.clone();
    let patch_for_write = patch.clone();
    let write_result = state
        .task_engine
        .run_write(move || async move {
            if factory {
                handle_set_factory_desc(desc.as_ref(), &key, &app_id_for_write, patch_for_write)
            } else {
                handle_set_desc(desc.as_ref(), &key, &app_id_for_write, patch_for_write)
            }
        })
        .await;

    match write_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return BusResponse::fatal(method, err.to_string()),
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    }
    let _ = (connection_id, params.notify_self);

    let merged = serde_json::to_value(&patch).unwrap_or(Value::Null);
    let notified_app_id = if app_id.is_empty() { None } else { Some(app_id.as_str()) };
    state
        .events
        .post_desc_change(state.notifier.as_ref(), &params.key, notified_app_id, merged)
        .await;

    BusResponse::ok(method)
}

async fn delete_settings(state: &ApiState, params: Value) -> BusResponse {
    let method = "deleteSystemSettings";
    let params: DeleteParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let app_id = params.app_id.unwrap_or_default();
    let Some(category) = resolve_category(
        state,
        params.category.as_deref(),
        params.dimension.as_ref(),
        &params.keys,
        &app_id,
    ) else {
        return BusResponse::fatal(method, "unable to resolve category for request");
    };

    let db = Arc::clone(&state.db);
    let volatile = Arc::clone(&state.volatile);
    let keys = params.keys.clone();
    let category_for_write = category.clone();
    let app_for_write = app_id.clone();
    let result = state
        .task_engine
        .run_write(move || async move {
            handle_delete(
                db.as_ref(),
                volatile.as_ref(),
                DeleteRequest {
                    category: &category_for_write,
                    app_id: &app_for_write,
                    keys,
                    also_default: false,
                },
            )
            .await
        })
        .await;

    match result {
        Ok(Ok(removed_count)) => {
            if removed_count > 0 {
                let db = Arc::clone(&state.db);
                let desc = Arc::clone(&state.desc);
                let volatile = Arc::clone(&state.volatile);
                if let Ok(reply) = handle_get(
                    db.as_ref(),
                    desc.as_ref(),
                    volatile.as_ref(),
                    GetRequest {
                        category: &category,
                        keys: Some(params.keys.clone()),
                        app_id: &app_id,
                    },
                )
                .await
                {
                    let (bare_category, dimension) = state.desc.split_category_dim(&category);
                    let notice_dimension = (!dimension.is_empty()).then_some(dimension);
                    let notices: Vec<WriteNotice> = reply
                        .settings
                        .iter()
                        .map(|(key, value)| WriteNotice {
                            category: bare_category.clone(),
                            key: key.clone(),
                            value: Some(value.clone()),
                            app_id: if app_id.is_empty() { None } else { Some(app_id.clone()) },
                            dimension: notice_dimension.clone(),
                            is_mixed: state.desc.db_type_of(key, &app_id)
                                == Some(settingsd_desc::DbType::M),
                        })
                        .collect();
                    if !notices.is_empty() {
                        state.events.post_pref_change(state.notifier.as_ref(), &notices, None).await;
                    }
                }
            }
            let (bare_category, dimension) = state.desc.split_category_dim(&category);
            let mut response = BusResponse::ok(method);
            response.category = Some(bare_category);
            response.dimension = (!dimension.is_empty()).then_some(dimension);
            response.app_id = Some(app_id);
            response
        }
        Ok(Err(err)) => BusResponse::fatal(method, err.to_string()),
        Err(err) => BusResponse::fatal(method, err.to_string()),
    }
}

async fn reset_settings(state: &ApiState, _connection_id: Option<&str>, params: Value) -> BusResponse {
    let method = "resetSystemSettings";
    let params: ResetParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let app_id = params.app_id.unwrap_or_default();
    let keys = params.keys.clone().unwrap_or_default();
    let Some(category) =
        resolve_category(state, params.category.as_deref(), params.dimension.as_ref(), &keys, &app_id)
    else {
        return BusResponse::fatal(method, "unable to resolve category for request");
    };
    let reset_all = params.reset_all.unwrap_or(false);

    let db = Arc::clone(&state.db);
    let volatile = Arc::clone(&state.volatile);
    let category_for_write = category.clone();
    let app_for_write = app_id.clone();
    let result = state
        .task_engine
        .run_write(move || async move {
            handle_reset(
                db.as_ref(),
                volatile.as_ref(),
                ResetRequest { category: &category_for_write, app_id: &app_for_write, keys, reset_all },
            )
            .await
        })
        .await;

    let outcomes = match result {
        Ok(Ok(outcomes)) => outcomes,
        Ok(Err(err)) => return BusResponse::fatal(method, err.to_string()),
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };

    for outcome in &outcomes {
        let tuple = settingsd_task::RequestGetSystemSettingsTuple {
            category: outcome.category.clone(),
            app_id: outcome.app_id.clone(),
            keys: None,
        };
        let db = Arc::clone(&state.db);
        let desc = Arc::clone(&state.desc);
        let volatile = Arc::clone(&state.volatile);
        if let Ok(reply) = handle_get(
            db.as_ref(),
            desc.as_ref(),
            volatile.as_ref(),
            GetRequest {
                category: &tuple.category,
                keys: tuple.keys.clone(),
                app_id: &tuple.app_id,
            },
        )
        .await
        {
            let (bare_category, dimension) = state.desc.split_category_dim(&outcome.category);
            let notice_dimension = (!dimension.is_empty()).then_some(dimension);
            let notices: Vec<WriteNotice> = reply
                .settings
                .iter()
                .map(|(key, value)| WriteNotice {
                    category: bare_category.clone(),
                    key: key.clone(),
                    value: Some(value.clone()),
                    app_id: if outcome.app_id.is_empty() { None } else { Some(outcome.app_id.clone()) },
                    dimension: notice_dimension.clone(),
                    is_mixed: false,
                })
                .collect();
            state.events.post_pref_change(state.notifier.as_ref(), &notices, None).await;
        }
    }

    BusResponse::ok(method)
}

async fn reset_desc(state: &ApiState, params: Value) -> BusResponse {
    let method = "resetSystemSettingDesc";
    let params: ResetDescParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };
    let app_ids = vec![params.app_id.unwrap_or_default()];
    let desc = Arc::clone(&state.desc);
    let keys = params.keys;
    let _ = state
        .task_engine
        .run_write(move || async move {
            handle_reset_desc(desc.as_ref(), &keys, &app_ids);
        })
        .await;
    BusResponse::ok(method)
}

/// App-uninstall notification: purges the app's per-app settings rows and
/// description buckets and clears the current-app pointer if it matched.
async fn remove_app(state: &ApiState, params: Value) -> BusResponse {
    let method = "removeApp";
    let params: RemoveAppParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };

    let db = Arc::clone(&state.db);
    let desc = Arc::clone(&state.desc);
    let app_state = Arc::clone(&state.app_state);
    let app_id = params.app_id;
    let outcome = state
        .task_engine
        .run_write(move || async move {
            app_state.handle_app_uninstalled(db.as_ref(), desc.as_ref(), &app_id).await
        })
        .await;

    match outcome {
        Ok(Ok(())) => BusResponse::ok(method),
        Ok(Err(err)) => BusResponse::fatal(method, err.to_string()),
        Err(err) => BusResponse::fatal(method, err.to_string()),
    }
}

/// Run every batched sub-operation as its own task against a shared
/// [`settingsd_task::BatchAccumulator`], rather than awaiting them one at a
/// time: a slow read in one slot no longer blocks the others from starting,
/// and the accumulator reassembles the reply list in the caller's original
/// order once the last slot fills.
async fn batch(state: &ApiState, connection_id: Option<&str>, params: Value) -> BusResponse {
    let method = "batch";
    let params: BatchParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return BusResponse::fatal(method, err.to_string()),
    };

    let accumulator = Arc::new(settingsd_task::BatchAccumulator::new(params.operations.len()));
    let connection_id = connection_id.map(str::to_string);
    let mut handles = Vec::with_capacity(params.operations.len());

    for (index, BatchOperationParams { method: sub_method, params: sub_params }) in
        params.operations.into_iter().enumerate()
    {
        let state = state.clone();
        let connection_id = connection_id.clone();
        let accumulator = Arc::clone(&accumulator);
        handles.push(tokio::spawn(async move {
            let envelope = serde_json::json!({"method": sub_method, "params": sub_params});
            let sub_response = Box::pin(dispatch(&state, connection_id.as_deref(), envelope)).await;
            let value = serde_json::to_value(sub_response).unwrap_or(Value::Null);
            accumulator.complete(index, value)
        }));
    }

    let mut assembled = Vec::new();
    for handle in handles {
        if let Ok(Some(results)) = handle.await {
            assembled = results;
        }
    }

    let mut response = BusResponse::ok(method);
    response.results = Some(assembled);
    response.subscribed = params.subscribe;
    response
}
