//! Teardown ordering ledger.
//!
//! An append-only log of resource lifecycle events, fed by construction and
//! teardown. Destruction must be the exact reverse of construction, and a
//! device-idle wait must precede device destruction; the driver cannot
//! report violations of either after the fact, so the ledger checks them on
//! the host side. Recording is a cheap enum push per stage.

/// Stage-level resources tracked by the ledger, one per owned handle group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Instance,
    Device,
    FrameFence,
    Surface,
    Swapchain,
    SwapchainImageViews,
    CommandPool,
    DepthBuffer,
    RenderPass,
    Framebuffers,
}

/// One lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    Created(Resource),
    Destroyed(Resource),
    DeviceWaitIdle,
}

/// An ordering rule broken by the recorded event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A destroy was recorded for a resource never created.
    DestroyedWithoutCreate(Resource),
    /// A resource was destroyed twice.
    DestroyedTwice(Resource),
    /// A resource was destroyed while a later-created resource was still
    /// live; the dependent outlived its teardown slot.
    OutOfOrder {
        destroyed: Resource,
        still_live: Resource,
    },
    /// The device was destroyed without a preceding device-idle wait.
    WaitIdleMissing,
    /// A resource was created and never destroyed.
    Leaked(Resource),
}

/// Append-only record of construction and teardown events.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    events: Vec<LedgerEvent>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&mut self, resource: Resource) {
        self.events.push(LedgerEvent::Created(resource));
    }

    pub fn record_destroyed(&mut self, resource: Resource) {
        self.events.push(LedgerEvent::Destroyed(resource));
    }

    pub fn record_wait_idle(&mut self) {
        self.events.push(LedgerEvent::DeviceWaitIdle);
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Check ordering rules over the recorded events.
    ///
    /// Reverse-order teardown means every destroy must target the most
    /// recently created resource that is still live.
    pub fn verify(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut live: Vec<Resource> = Vec::new();
        let mut destroyed: Vec<Resource> = Vec::new();
        let mut wait_idle_seen = false;

        for event in &self.events {
            match *event {
                LedgerEvent::Created(resource) => live.push(resource),
                LedgerEvent::DeviceWaitIdle => wait_idle_seen = true,
                LedgerEvent::Destroyed(resource) => {
                    let Some(position) = live.iter().rposition(|&r| r == resource) else {
                        if destroyed.contains(&resource) {
                            violations.push(Violation::DestroyedTwice(resource));
                        } else {
                            violations.push(Violation::DestroyedWithoutCreate(resource));
                        }
                        continue;
                    };
                    if position != live.len() - 1 {
                        violations.push(Violation::OutOfOrder {
                            destroyed: resource,
                            still_live: live[live.len() - 1],
                        });
                    }
                    if resource == Resource::Device && !wait_idle_seen {
                        violations.push(Violation::WaitIdleMissing);
                    }
                    live.remove(position);
                    destroyed.push(resource);
                }
            }
        }

        violations
    }

    /// [`verify`](Self::verify) plus a leak check: everything created must
    /// also have been destroyed.
    pub fn verify_complete(&self) -> Vec<Violation> {
        let mut violations = self.verify();
        let mut live: Vec<Resource> = Vec::new();
        for event in &self.events {
            match *event {
                LedgerEvent::Created(resource) => live.push(resource),
                LedgerEvent::Destroyed(resource) => {
                    if let Some(position) = live.iter().rposition(|&r| r == resource) {
                        live.remove(position);
                    }
                }
                LedgerEvent::DeviceWaitIdle => {}
            }
        }
        violations.extend(live.into_iter().map(Violation::Leaked));
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The full construction order, as the context builder records it.
    const FULL_BUILD: [Resource; 10] = [
        Resource::Instance,
        Resource::Device,
        Resource::FrameFence,
        Resource::Surface,
        Resource::Swapchain,
        Resource::SwapchainImageViews,
        Resource::CommandPool,
        Resource::DepthBuffer,
        Resource::RenderPass,
        Resource::Framebuffers,
    ];

    fn build_then_reverse_teardown(created: &[Resource]) -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        for &resource in created {
            ledger.record_created(resource);
        }
        if created.contains(&Resource::Device) {
            ledger.record_wait_idle();
        }
        for &resource in created.iter().rev() {
            ledger.record_destroyed(resource);
        }
        ledger
    }

    #[test]
    fn reverse_order_teardown_is_clean() {
        let ledger = build_then_reverse_teardown(&FULL_BUILD);
        assert!(ledger.verify_complete().is_empty());
    }

    #[test]
    fn out_of_order_teardown_is_detected() {
        let mut ledger = ResourceLedger::new();
        ledger.record_created(Resource::Instance);
        ledger.record_created(Resource::Device);
        ledger.record_created(Resource::Surface);
        ledger.record_wait_idle();
        // Destroying the device while the surface is still live breaks the
        // reverse-order rule.
        ledger.record_destroyed(Resource::Device);
        ledger.record_destroyed(Resource::Surface);
        ledger.record_destroyed(Resource::Instance);

        let violations = ledger.verify();
        assert!(violations.contains(&Violation::OutOfOrder {
            destroyed: Resource::Device,
            still_live: Resource::Surface,
        }));
    }

    #[test]
    fn device_destroy_without_wait_idle_is_detected() {
        let mut ledger = ResourceLedger::new();
        ledger.record_created(Resource::Instance);
        ledger.record_created(Resource::Device);
        ledger.record_destroyed(Resource::Device);
        ledger.record_destroyed(Resource::Instance);

        assert!(ledger.verify().contains(&Violation::WaitIdleMissing));
    }

    #[test]
    fn wait_idle_precedes_device_destroy_in_every_teardown_path() {
        // Every prefix of the construction order is a possible failure
        // point; each partial teardown must still wait for the device
        // before destroying it.
        for failed_after in 1..=FULL_BUILD.len() {
            let ledger = build_then_reverse_teardown(&FULL_BUILD[..failed_after]);
            assert!(
                ledger.verify_complete().is_empty(),
                "teardown after stage {failed_after} reported violations"
            );

            if failed_after >= 2 {
                let events = ledger.events();
                let wait = events
                    .iter()
                    .position(|e| *e == LedgerEvent::DeviceWaitIdle)
                    .unwrap();
                let destroy = events
                    .iter()
                    .position(|e| *e == LedgerEvent::Destroyed(Resource::Device))
                    .unwrap();
                assert!(wait < destroy);
            }
        }
    }

    #[test]
    fn double_destroy_is_detected() {
        let mut ledger = ResourceLedger::new();
        ledger.record_created(Resource::Surface);
        ledger.record_destroyed(Resource::Surface);
        ledger.record_destroyed(Resource::Surface);

        assert!(ledger
            .verify()
            .contains(&Violation::DestroyedTwice(Resource::Surface)));
    }

    #[test]
    fn destroy_without_create_is_detected() {
        let mut ledger = ResourceLedger::new();
        ledger.record_destroyed(Resource::Swapchain);
        assert_eq!(
            ledger.verify(),
            vec![Violation::DestroyedWithoutCreate(Resource::Swapchain)]
        );
    }

    #[test]
    fn leaked_resources_are_reported_by_the_complete_check() {
        let mut ledger = ResourceLedger::new();
        ledger.record_created(Resource::Instance);
        ledger.record_created(Resource::Device);
        ledger.record_wait_idle();
        ledger.record_destroyed(Resource::Device);

        let violations = ledger.verify_complete();
        assert!(violations.contains(&Violation::Leaked(Resource::Instance)));
        assert!(ledger.verify().is_empty());
    }
}
