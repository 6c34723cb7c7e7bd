#![allow(dead_code)]

use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Waker},
    time::Duration,
};

use async_trait::async_trait;
use hashbrown::HashMap;
use switchman::{
    api::{Api, ApiError, ApiResponse, TransportError},
    types::{CommandKind, ItemId},
};

/// What the scripted remote side does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Status(u16),
    Transport(&'static str),
    Delay(Duration),
    Never,
    Panic,
}

#[derive(Default)]
struct Script {
    catalogs: Mutex<VecDeque<Result<Vec<ItemId>, TransportError>>>,
    replies: Mutex<HashMap<(CommandKind, ItemId), VecDeque<Reply>>>,
    calls: Mutex<Vec<(CommandKind, ItemId)>>,
    in_flight: Mutex<HashMap<ItemId, usize>>,
    max_in_flight: Mutex<HashMap<ItemId, usize>>,
}

/// Api double with per-item reply queues. Unscripted calls answer `200 OK`.
#[derive(Clone, Default)]
pub struct ScriptedApi {
    script: Arc<Script>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_catalog(&self, ids: &[&str]) {
        self.script
            .catalogs
            .lock()
            .expect("lock")
            .push_back(Ok(ids.iter().map(|id| ItemId::from(*id)).collect()));
    }

    pub fn push_catalog_error(&self, message: &str) {
        self.script
            .catalogs
            .lock()
            .expect("lock")
            .push_back(Err(TransportError::new(message)));
    }

    pub fn on_add(&self, id: &str, replies: impl IntoIterator<Item = Reply>) {
        self.script_replies(CommandKind::Add, id, replies);
    }

    pub fn on_remove(&self, id: &str, replies: impl IntoIterator<Item = Reply>) {
        self.script_replies(CommandKind::Remove, id, replies);
    }

    pub fn add_calls(&self, id: &str) -> usize {
        self.count_calls(CommandKind::Add, id)
    }

    pub fn remove_calls(&self, id: &str) -> usize {
        self.count_calls(CommandKind::Remove, id)
    }

    pub fn total_calls(&self) -> usize {
        self.script.calls.lock().expect("lock").len()
    }

    pub fn max_in_flight(&self, id: &str) -> usize {
        self.script
            .max_in_flight
            .lock()
            .expect("lock")
            .get(&ItemId::from(id))
            .copied()
            .unwrap_or(0)
    }

    fn script_replies(&self, kind: CommandKind, id: &str, replies: impl IntoIterator<Item = Reply>) {
        self.script
            .replies
            .lock()
            .expect("lock")
            .entry((kind, ItemId::from(id)))
            .or_default()
            .extend(replies);
    }

    fn count_calls(&self, kind: CommandKind, id: &str) -> usize {
        let id = ItemId::from(id);
        self.script
            .calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|(k, i)| *k == kind && *i == id)
            .count()
    }

    async fn answer(&self, kind: CommandKind, id: &ItemId) -> Result<ApiResponse, TransportError> {
        let reply = {
            self.script.calls.lock().expect("lock").push((kind, id.clone()));
            let mut in_flight = self.script.in_flight.lock().expect("lock");
            let now = in_flight.entry(id.clone()).or_default();
            *now += 1;
            let mut max = self.script.max_in_flight.lock().expect("lock");
            let seen = max.entry(id.clone()).or_default();
            *seen = (*seen).max(*now);
            self.script
                .replies
                .lock()
                .expect("lock")
                .get_mut(&(kind, id.clone()))
                .and_then(VecDeque::pop_front)
                .unwrap_or(Reply::Ok)
        };

        let out = match reply {
            Reply::Ok => Ok(ApiResponse::successful()),
            Reply::Status(code) => Ok(ApiResponse::failed(
                code,
                ApiError::Status {
                    code,
                    message: format!("status {code}"),
                },
            )),
            Reply::Transport(message) => Err(TransportError::new(message)),
            Reply::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(ApiResponse::successful())
            }
            Reply::Never => std::future::pending().await,
            Reply::Panic => panic!("scripted api panic"),
        };

        if let Some(now) = self.script.in_flight.lock().expect("lock").get_mut(id) {
            *now -= 1;
        }
        out
    }
}

#[async_trait]
impl Api for ScriptedApi {
    type Item = ItemId;

    async fn get_item_list(&self) -> Result<Vec<ItemId>, TransportError> {
        let next = self.script.catalogs.lock().expect("lock").pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn add_item(&self, id: &ItemId) -> Result<ApiResponse, TransportError> {
        self.answer(CommandKind::Add, id).await
    }

    async fn remove_item(&self, id: &ItemId) -> Result<ApiResponse, TransportError> {
        self.answer(CommandKind::Remove, id).await
    }
}

pub fn id(raw: &str) -> ItemId {
    ItemId::from(raw)
}

/// Polls `fut` once so the request is issued, without letting any worker run.
pub fn issue<F: Future>(fut: F) -> Pin<Box<F>> {
    let mut fut = Box::pin(fut);
    assert!(is_pending(&mut fut), "request resolved on its first poll");
    fut
}

/// Polls once more without blocking.
pub fn is_pending<F: Future>(fut: &mut Pin<Box<F>>) -> bool {
    let mut cx = Context::from_waker(Waker::noop());
    fut.as_mut().poll(&mut cx).is_pending()
}

/// Yields until `cond` holds, giving spawned workers a chance to run.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
