//! Approval Queue.
//!
//! Parks `ask` decisions for human adjudication with bounded waits. New
//! relative to the teacher, which resolves approvals synchronously via a
//! 30-second `EventBus` round-trip inline in the agent loop
//! (`agent/loop_.rs::execute_tool_call`). Built in the teacher's idiom: a
//! `Mutex`-protected ordered map (the same interior-mutability style as
//! `policy::SecurityPolicy`'s former `action_log: Mutex<Vec<AuditEntry>>`),
//! a `tokio::time::interval` sweep task (the same pattern as the teacher's
//! scheduler heartbeat), and `event_bus::AppEvent` publication so any
//! subscriber can observe approval requests. `await_decision` uses a
//! `tokio::sync::Notify` per request rather than the teacher's blind
//! broadcast `recv()` loop, avoiding "denies on any unrelated broadcast lag".

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::policy::RiskLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
    Modified,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub id: String,
    pub session_id: String,
    pub agent_id: String,
    pub tool_name: String,
    pub command: String,
    pub risk: RiskLevel,
    pub reasoning: String,
    pub impact: String,
    pub status: ApprovalStatus,
    pub justification: Option<String>,
    pub modified_command: Option<String>,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub decided_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl ApprovalRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
        command: impl Into<String>,
        risk: RiskLevel,
        reasoning: impl Into<String>,
        impact: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let requested_at = chrono::Utc::now();
        Self {
            id: id.into(),
            session_id: session_id.into(),
            agent_id: agent_id.into(),
            tool_name: tool_name.into(),
            command: command.into(),
            risk,
            reasoning: reasoning.into(),
            impact: impact.into(),
            status: ApprovalStatus::Pending,
            justification: None,
            modified_command: None,
            requested_at,
            decided_at: None,
            expires_at: requested_at + chrono::Duration::seconds(timeout_secs as i64),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("approval request not found: {0}")]
    NotFound(String),

    #[error("approval request {0} is already terminal")]
    AlreadyTerminal(String),

    #[error("approval timed out")]
    TimedOut,
}

struct Waiter {
    notify: Arc<Notify>,
}

/// FIFO queue of pending human-approval decisions.
pub struct ApprovalQueue {
    // Ordered by submission; VecDeque tracks FIFO promotion order, the map
    // holds the actual request state keyed by id.
    order: Mutex<VecDeque<String>>,
    requests: Mutex<HashMap<String, ApprovalRequest>>,
    waiters: Mutex<HashMap<String, Waiter>>,
    /// Ids temporarily passed over by `skip_current`, so `current()` moves
    /// on to the next pending request without deciding this one.
    skipped: Mutex<std::collections::HashSet<String>>,
    bus: Option<Arc<dyn crate::event_bus::EventBus>>,
}

impl ApprovalQueue {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
            requests: Mutex::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            skipped: Mutex::new(std::collections::HashSet::new()),
            bus: None,
        }
    }

    pub fn with_event_bus(bus: Arc<dyn crate::event_bus::EventBus>) -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
            requests: Mutex::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            skipped: Mutex::new(std::collections::HashSet::new()),
            bus: Some(bus),
        }
    }

    /// Append `request`; if no request is currently promoted, this becomes it.
    pub async fn submit(&self, request: ApprovalRequest) {
        let id = request.id.clone();

        if let Some(bus) = &self.bus {
            let _ = bus.publish(crate::event_bus::AppEvent::ApprovalNeeded {
                action_id: id.clone(),
                tool_name: request.tool_name.clone(),
                description: request.reasoning.clone(),
                risk_level: request.risk.as_str().to_string(),
            });
        }

        self.order.lock().await.push_back(id.clone());
        self.requests.lock().await.insert(id.clone(), request);
        self.waiters.lock().await.insert(
            id,
            Waiter {
                notify: Arc::new(Notify::new()),
            },
        );
    }

    /// The earliest-submitted pending, non-skipped request, if any (FIFO promotion).
    pub async fn current(&self) -> Option<ApprovalRequest> {
        let order = self.order.lock().await;
        let requests = self.requests.lock().await;
        let skipped = self.skipped.lock().await;
        order.iter().find_map(|id| {
            if skipped.contains(id) {
                return None;
            }
            requests.get(id).filter(|r| r.status == ApprovalStatus::Pending).cloned()
        })
    }

    /// Un-promote the current request without deciding it. The next
    /// `current()` call surfaces the next earliest-submitted pending
    /// request instead.
    pub async fn skip_current(&self) {
        if let Some(req) = self.current().await {
            self.skipped.lock().await.insert(req.id);
        }
    }

    pub async fn approve(
        &self,
        id: &str,
        justification: Option<String>,
        modified_command: Option<String>,
    ) -> Result<(), ApprovalError> {
        self.transition(id, |req| {
            req.justification = justification;
            req.status = if let Some(cmd) = modified_command {
                req.modified_command = Some(cmd);
                ApprovalStatus::Modified
            } else {
                ApprovalStatus::Approved
            };
        })
        .await
    }

    pub async fn deny(&self, id: &str, justification: Option<String>) -> Result<(), ApprovalError> {
        self.transition(id, |req| {
            req.justification = justification;
            req.status = ApprovalStatus::Denied;
        })
        .await
    }

    async fn transition(
        &self,
        id: &str,
        apply: impl FnOnce(&mut ApprovalRequest),
    ) -> Result<(), ApprovalError> {
        let mut requests = self.requests.lock().await;
        let req = requests.get_mut(id).ok_or_else(|| ApprovalError::NotFound(id.to_string()))?;
        if req.status.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(id.to_string()));
        }
        apply(req);
        req.decided_at = Some(chrono::Utc::now());
        drop(requests);

        if let Some(waiter) = self.waiters.lock().await.get(id) {
            waiter.notify.notify_waiters();
        }

        if let Some(bus) = &self.bus {
            let requests = self.requests.lock().await;
            if let Some(req) = requests.get(id) {
                let _ = bus.publish(crate::event_bus::AppEvent::ApprovalResponse {
                    action_id: id.to_string(),
                    approved: matches!(req.status, ApprovalStatus::Approved | ApprovalStatus::Modified),
                });
            }
        }

        Ok(())
    }

    /// Flip all `pending` requests whose `expires_at < now` to `expired`.
    pub async fn expire_pending(&self, now: chrono::DateTime<chrono::Utc>) {
        let mut requests = self.requests.lock().await;
        let mut expired_ids = Vec::new();
        for (id, req) in requests.iter_mut() {
            if req.status == ApprovalStatus::Pending && req.expires_at < now {
                req.status = ApprovalStatus::Expired;
                req.decided_at = Some(now);
                expired_ids.push(id.clone());
            }
        }
        drop(requests);

        let waiters = self.waiters.lock().await;
        for id in expired_ids {
            if let Some(waiter) = waiters.get(&id) {
                waiter.notify.notify_waiters();
            }
        }
    }

    /// Suspend until `id` reaches a terminal status or `deadline` passes.
    pub async fn await_decision(
        &self,
        id: &str,
        deadline: chrono::DateTime<chrono::Utc>,
    ) -> Result<ApprovalRequest, ApprovalError> {
        loop {
            {
                let requests = self.requests.lock().await;
                let req = requests.get(id).ok_or_else(|| ApprovalError::NotFound(id.to_string()))?;
                if req.status.is_terminal() {
                    return Ok(req.clone());
                }
            }

            let notify = {
                let waiters = self.waiters.lock().await;
                waiters.get(id).map(|w| w.notify.clone())
            };
            let Some(notify) = notify else {
                return Err(ApprovalError::NotFound(id.to_string()));
            };

            let now = chrono::Utc::now();
            if now >= deadline {
                return Err(ApprovalError::TimedOut);
            }
            let remaining = (deadline - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(0));

            tokio::select! {
                _ = notify.notified() => continue,
                _ = tokio::time::sleep(remaining) => {
                    return Err(ApprovalError::TimedOut);
                }
            }
        }
    }

    /// Spawn the periodic expiry sweeper. Returns a handle the caller may
    /// abort on shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                queue.expire_pending(chrono::Utc::now()).await;
            }
        })
    }
}

impl Default for ApprovalQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request(id: &str, timeout_secs: u64) -> ApprovalRequest {
        ApprovalRequest::new(
            id,
            "session-1",
            "agent-1",
            "write_file",
            "write_file /tmp/x",
            RiskLevel::Medium,
            "classified as medium risk",
            "Target: /tmp/x",
            timeout_secs,
        )
    }

    #[tokio::test]
    async fn submit_then_current_returns_earliest_pending() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;
        queue.submit(sample_request("req-2", 60)).await;

        let current = queue.current().await.unwrap();
        assert_eq!(current.id, "req-1");
    }

    #[tokio::test]
    async fn skip_current_promotes_next_pending_request() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;
        queue.submit(sample_request("req-2", 60)).await;

        queue.skip_current().await;
        let current = queue.current().await.unwrap();
        assert_eq!(current.id, "req-2");
    }

    #[tokio::test]
    async fn approve_transitions_to_approved() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;

        queue.approve("req-1", Some("looks fine".to_string()), None).await.unwrap();

        let req = queue.requests.lock().await.get("req-1").cloned().unwrap();
        assert_eq!(req.status, ApprovalStatus::Approved);
        assert!(req.decided_at.is_some());
    }

    #[tokio::test]
    async fn approve_with_modified_command_yields_modified_status() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;

        queue.approve("req-1", None, Some("write_file /tmp/safe".to_string())).await.unwrap();

        let req = queue.requests.lock().await.get("req-1").cloned().unwrap();
        assert_eq!(req.status, ApprovalStatus::Modified);
        assert_eq!(req.modified_command.as_deref(), Some("write_file /tmp/safe"));
    }

    #[tokio::test]
    async fn deny_transitions_to_denied() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;

        queue.deny("req-1", Some("too risky".to_string())).await.unwrap();

        let req = queue.requests.lock().await.get("req-1").cloned().unwrap();
        assert_eq!(req.status, ApprovalStatus::Denied);
    }

    #[tokio::test]
    async fn second_decision_on_terminal_request_fails() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;
        queue.approve("req-1", None, None).await.unwrap();

        let result = queue.deny("req-1", None).await;
        assert!(matches!(result, Err(ApprovalError::AlreadyTerminal(_))));
    }

    #[tokio::test]
    async fn decision_on_unknown_id_fails() {
        let queue = ApprovalQueue::new();
        let result = queue.approve("missing", None, None).await;
        assert!(matches!(result, Err(ApprovalError::NotFound(_))));
    }

    #[tokio::test]
    async fn expire_pending_flips_timed_out_requests() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 0)).await;

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.expire_pending(chrono::Utc::now()).await;

        let req = queue.requests.lock().await.get("req-1").cloned().unwrap();
        assert_eq!(req.status, ApprovalStatus::Expired);
    }

    #[tokio::test]
    async fn expire_pending_does_not_touch_decided_requests() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 0)).await;
        queue.approve("req-1", None, None).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.expire_pending(chrono::Utc::now()).await;

        let req = queue.requests.lock().await.get("req-1").cloned().unwrap();
        assert_eq!(req.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn await_decision_returns_once_approved() {
        let queue = Arc::new(ApprovalQueue::new());
        queue.submit(sample_request("req-1", 60)).await;

        let queue2 = Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            queue2.approve("req-1", None, None).await.unwrap();
        });

        let deadline = chrono::Utc::now() + chrono::Duration::seconds(5);
        let result = queue.await_decision("req-1", deadline).await.unwrap();
        assert_eq!(result.status, ApprovalStatus::Approved);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn await_decision_times_out_at_deadline() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;

        let deadline = chrono::Utc::now() + chrono::Duration::milliseconds(20);
        let result = queue.await_decision("req-1", deadline).await;
        assert!(matches!(result, Err(ApprovalError::TimedOut)));
    }

    #[tokio::test]
    async fn every_request_reaches_exactly_one_terminal_status() {
        let queue = ApprovalQueue::new();
        queue.submit(sample_request("req-1", 60)).await;
        queue.approve("req-1", None, None).await.unwrap();

        // Further decisions must fail — exactly one terminal transition occurred.
        assert!(queue.deny("req-1", None).await.is_err());
        assert!(queue.approve("req-1", None, None).await.is_err());
    }
}
