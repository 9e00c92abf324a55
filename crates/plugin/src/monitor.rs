//! Polling monitor for registry and card events
//!
//! The core operations are synchronous; hosts that want asynchronous
//! connect/disconnect notifications attach a [`RegistryMonitor`] that
//! polls a shared registry each cycle, diffs against the previously
//! observed state and dispatches [`ReaderEvent`]/[`CardEvent`]s to a
//! handler or a channel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cardsim_core::{Error, Result, VirtualReader};

use crate::config::MonitorConfig;
use crate::event::callback::{CardEventHandler, ReaderEventHandler};
use crate::event::channel::{CardEventSender, ReaderEventSender};
use crate::event::{CardEvent, ReaderEvent};
use crate::registry::ReaderRegistry;

/// Monitor for reader plug/unplug and card insertion/removal events
#[derive(Debug)]
pub struct RegistryMonitor {
    /// Registry being observed
    registry: Arc<ReaderRegistry>,
    /// Whether the monitor is running
    running: Arc<AtomicBool>,
    /// Duration between two monitoring cycles
    cycle: Duration,
}

impl RegistryMonitor {
    /// Create a monitor for the given registry with the default cycle
    pub fn new(registry: Arc<ReaderRegistry>) -> Self {
        Self::with_config(registry, MonitorConfig::default())
    }

    /// Create a monitor for the given registry with a custom configuration
    pub fn with_config(registry: Arc<ReaderRegistry>, config: MonitorConfig) -> Self {
        Self {
            registry,
            running: Arc::new(AtomicBool::new(true)),
            cycle: config.cycle,
        }
    }

    /// Watch for reader plug/unplug events with a callback
    ///
    /// Readers already plugged when watching starts are reported as
    /// plugged on the first cycle. The spawned thread exits when the
    /// monitor is stopped.
    pub fn watch_readers<H>(&self, mut handler: H)
    where
        H: ReaderEventHandler + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let running = Arc::clone(&self.running);
        let cycle = self.cycle;

        thread::spawn(move || {
            let mut previous: HashSet<String> = HashSet::new();

            while running.load(Ordering::Acquire) {
                let current = registry.reader_names();

                for name in current.difference(&previous) {
                    handler.handle_event(ReaderEvent::Plugged(name.clone()));
                }
                for name in previous.difference(&current) {
                    handler.handle_event(ReaderEvent::Unplugged(name.clone()));
                }

                previous = current;
                thread::sleep(cycle);
            }
        });
    }

    /// Watch for reader plug/unplug events using a channel
    pub fn watch_readers_channel(&self, sender: ReaderEventSender) {
        self.watch_readers(move |event| {
            let _ = sender.send(event);
        });
    }

    /// Watch for card insertion/removal events with a callback
    ///
    /// Cards already present when watching starts are reported as
    /// inserted on the first cycle.
    pub fn watch_cards<H>(&self, mut handler: H)
    where
        H: CardEventHandler + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let running = Arc::clone(&self.running);
        let cycle = self.cycle;

        thread::spawn(move || {
            let mut previous: HashMap<String, bool> = HashMap::new();

            while running.load(Ordering::Acquire) {
                let readers = registry.readers();
                let mut seen: HashSet<String> = HashSet::with_capacity(readers.len());

                for reader in readers {
                    let name = reader.name().to_string();
                    let present = reader.is_card_present();
                    let was_present = previous.get(&name).copied().unwrap_or(false);

                    if present && !was_present {
                        // The card can disappear between the presence
                        // check and the read; report empty data then
                        let power_on_data = reader
                            .power_on_data()
                            .map(|data| data.to_vec())
                            .unwrap_or_default();
                        handler.handle_event(CardEvent::Inserted {
                            reader: name.clone(),
                            power_on_data,
                        });
                    } else if !present && was_present {
                        handler.handle_event(CardEvent::Removed {
                            reader: name.clone(),
                        });
                    }

                    seen.insert(name.clone());
                    previous.insert(name, present);
                }

                // Forget unplugged readers; their disappearance is a
                // reader event, not a card removal
                previous.retain(|name, _| seen.contains(name));

                thread::sleep(cycle);
            }
        });
    }

    /// Watch for card insertion/removal events using a channel
    pub fn watch_cards_channel(&self, sender: CardEventSender) {
        self.watch_cards(move |event| {
            let _ = sender.send(event);
        });
    }

    /// Block until the card is removed from the given reader
    ///
    /// Polls at the monitoring cycle. Fails with [`Error::Cancelled`]
    /// if the monitor is stopped before the card is removed.
    pub fn wait_for_card_removal(&self, reader: &VirtualReader) -> Result<()> {
        while reader.is_card_present() && self.running.load(Ordering::Acquire) {
            thread::sleep(self.cycle);
        }
        if !self.running.load(Ordering::Acquire) {
            return Err(Error::Cancelled("wait for card removal"));
        }
        Ok(())
    }

    /// Stop monitoring; all watch threads and waits terminate
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}
