// Copyright 2024 The Pulsar Rust Client Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Registry of live producers or consumers, keyed by entity identity.
//!
//! Every entity receives a unique [`EntityHandle`] when it is added, so two
//! entities on the same topic never collide. The shutdown snapshot seals the
//! registry: any later `add` is rejected and the caller must close the
//! entity itself.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

/// Implemented by every entity the client keeps track of.
pub trait RegisteredEntity: Clone + Send + Sync + 'static {
    /// Called by the registry, under its lock, when the entity is added.
    fn bind_registration(&self, registration: Registration<Self>);
}

struct RegistryInner<E> {
    entities: HashMap<EntityHandle, E>,
    sealed: bool,
}

pub struct EntityRegistry<E> {
    kind: &'static str,
    inner: Mutex<RegistryInner<E>>,
    next_handle: AtomicU64,
}

impl<E: RegisteredEntity> EntityRegistry<E> {
    pub fn new(kind: &'static str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            inner: Mutex::new(RegistryInner {
                entities: HashMap::new(),
                sealed: false,
            }),
            next_handle: AtomicU64::new(0),
        })
    }

    pub fn add(self: &Arc<Self>, entity: &E) -> PulsarResult<EntityHandle> {
        let mut inner = self.inner.lock();
        if inner.sealed {
            return Err(PulsarClientError::client_already_closed());
        }
        let handle = EntityHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        entity.bind_registration(Registration {
            registry: Arc::downgrade(self),
            handle,
        });
        inner.entities.insert(handle, entity.clone());
        debug!("{} {:?} registered, {} live", self.kind, handle, inner.entities.len());
        Ok(handle)
    }

    pub fn remove(&self, handle: EntityHandle) -> Option<E> {
        let mut inner = self.inner.lock();
        let removed = inner.entities.remove(&handle);
        if removed.is_some() {
            debug!("{} {:?} removed, {} live", self.kind, handle, inner.entities.len());
        }
        removed
    }

    /// Seals the registry and returns every entity present at that instant.
    pub fn seal_and_snapshot(&self) -> Vec<E> {
        let mut inner = self.inner.lock();
        inner.sealed = true;
        inner.entities.values().cloned().collect()
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An entity's membership in a registry. Releasing it removes the entity.
pub struct Registration<E> {
    registry: Weak<EntityRegistry<E>>,
    handle: EntityHandle,
}

impl<E: RegisteredEntity> Registration<E> {
    #[inline]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn release(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.handle).is_some(),
            None => false,
        }
    }
}

/// Slot an entity keeps its [`Registration`] in.
pub(crate) struct RegistrationSlot<E> {
    slot: Mutex<Option<Registration<E>>>,
}

impl<E: RegisteredEntity> RegistrationSlot<E> {
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    pub fn bind(&self, registration: Registration<E>) {
        *self.slot.lock() = Some(registration);
    }

    pub fn handle(&self) -> Option<EntityHandle> {
        self.slot.lock().as_ref().map(Registration::handle)
    }

    /// Removes the owner from its registry, at most once.
    pub fn release(&self) -> bool {
        let registration = self.slot.lock().take();
        registration.is_some_and(Registration::release)
    }
}
