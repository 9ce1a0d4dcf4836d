//! Device registry and backend leases.
//!
//! The registry maps each [`Device`] to the factory that creates its backends.
//! [`DeviceRegistry::acquire`] hands out a [`BackendLease`]: a fresh backend
//! plus, for exclusive devices, the device lock. Dropping the lease frees
//! every tensor allocated through it and then releases the lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{BackendFactory, BackendResult, CpuBackendFactory, Device, ExecutionBackend};
use crate::error::{CostModelError, CostResult};
use crate::program::{Op, TensorDesc, TensorId};

struct DeviceSlot {
    factory: Arc<dyn BackendFactory>,
    lock: Mutex<()>,
}

/// Factories by device
pub struct DeviceRegistry {
    slots: HashMap<Device, DeviceSlot>,
}

impl DeviceRegistry {
    /// Empty registry; every device is unavailable until registered
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Registry with the host CPU backend registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CpuBackendFactory::new()));
        registry
    }

    /// Register (or replace) the factory for its device
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        let device = factory.device();
        tracing::debug!(
            device = %device,
            exclusive = factory.exclusive(),
            "Registered backend factory"
        );
        self.slots.insert(
            device,
            DeviceSlot {
                factory,
                lock: Mutex::new(()),
            },
        );
    }

    /// Whether `device` is compiled in and has a factory
    pub fn is_available(&self, device: Device) -> bool {
        self.slot(device).is_ok()
    }

    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .slots
            .keys()
            .copied()
            .filter(Device::compiled_in)
            .collect();
        devices.sort_by_key(|d| d.as_str());
        devices
    }

    /// `DeviceUnavailable` unless `device` can be acquired
    pub fn check_available(&self, device: Device) -> CostResult<()> {
        self.slot(device).map(|_| ())
    }

    fn slot(&self, device: Device) -> CostResult<&DeviceSlot> {
        if !device.compiled_in() {
            return Err(CostModelError::DeviceUnavailable(format!(
                "{} support is not compiled into this build",
                device
            )));
        }
        self.slots.get(&device).ok_or_else(|| {
            CostModelError::DeviceUnavailable(format!("no backend registered for {}", device))
        })
    }

    /// Create a backend for `device`
    ///
    /// Blocks while another lease holds an exclusive device.
    pub fn acquire(&self, device: Device) -> CostResult<BackendLease<'_>> {
        let slot = self.slot(device)?;

        let guard = if slot.factory.exclusive() {
            Some(slot.lock.lock()?)
        } else {
            None
        };

        let backend = slot.factory.create()?;
        Ok(BackendLease {
            backend,
            allocated: Vec::new(),
            _guard: guard,
        })
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices())
            .finish()
    }
}

/// A backend checked out for one profiling call
///
/// Tensors allocated through the lease are freed when it drops, whatever
/// path the caller leaves by.
pub struct BackendLease<'a> {
    // Field order matters: the backend drops before the device lock.
    backend: Box<dyn ExecutionBackend>,
    allocated: Vec<TensorId>,
    _guard: Option<MutexGuard<'a, ()>>,
}

impl fmt::Debug for BackendLease<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendLease")
            .field("device", &self.backend.device())
            .field("allocated", &self.allocated)
            .finish()
    }
}

impl BackendLease<'_> {
    pub fn device(&self) -> Device {
        self.backend.device()
    }

    pub fn alloc(&mut self, desc: &TensorDesc) -> BackendResult<()> {
        self.backend.alloc(desc)?;
        if !self.allocated.contains(&desc.id) {
            self.allocated.push(desc.id);
        }
        Ok(())
    }

    pub fn execute_op(
        &mut self,
        op: &Op,
        inputs: &[TensorId],
        outputs: &[TensorId],
    ) -> BackendResult<()> {
        self.backend.execute_op(op, inputs, outputs)
    }

    pub fn synchronize(&mut self) -> BackendResult<()> {
        self.backend.synchronize()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.backend.allocated_bytes()
    }

    pub fn live_tensors(&self) -> usize {
        self.backend.live_tensors()
    }

    /// Free every tensor allocated through this lease
    ///
    /// Keeps going after a failed free and returns the first error.
    pub fn release_all(&mut self) -> BackendResult<()> {
        let mut first_err = None;
        for id in self.allocated.drain(..) {
            if let Err(e) = self.backend.free(id) {
                tracing::warn!(tensor = ?id, error = %e, "Failed to free tensor");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for BackendLease<'_> {
    fn drop(&mut self) {
        if !self.allocated.is_empty() {
            let _ = self.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackendFactory;

    #[test]
    fn test_default_registry_has_cpu() {
        let registry = DeviceRegistry::with_defaults();
        assert!(registry.is_available(Device::Cpu));
        assert!(!registry.is_available(Device::Gpu));
        assert!(registry.acquire(Device::Cpu).is_ok());
    }

    #[test]
    fn test_unregistered_device_is_unavailable() {
        let registry = DeviceRegistry::new();
        let err = registry.acquire(Device::Cpu).unwrap_err();
        assert!(matches!(err, CostModelError::DeviceUnavailable(_)));
    }

    #[cfg(not(feature = "rocm"))]
    #[test]
    fn test_gpu_factory_ignored_without_rocm() {
        let mut registry = DeviceRegistry::new();
        registry.register(Arc::new(DummyBackendFactory::new(Device::Gpu)));

        assert!(!registry.is_available(Device::Gpu));
        let err = registry.acquire(Device::Gpu).unwrap_err();
        assert!(matches!(err, CostModelError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_lease_drop_frees_tensors() {
        let factory = DummyBackendFactory::new(Device::Cpu);
        let stats = factory.stats();
        let mut registry = DeviceRegistry::new();
        registry.register(Arc::new(factory));

        {
            let mut lease = registry.acquire(Device::Cpu).unwrap();
            let mut a = TensorDesc::f32("a", vec![4]);
            a.id = TensorId(0);
            let mut b = TensorDesc::f32("b", vec![4]);
            b.id = TensorId(1);
            lease.alloc(&a).unwrap();
            lease.alloc(&b).unwrap();
            assert_eq!(lease.live_tensors(), 2);
        }

        let stats = stats.lock().unwrap();
        assert_eq!(stats.alloc_count, 2);
        assert_eq!(stats.free_count, 2);
    }

    #[test]
    fn test_exclusive_lease_serializes() {
        let factory = DummyBackendFactory::new(Device::Cpu).with_exclusive(true);
        let mut registry = DeviceRegistry::new();
        registry.register(Arc::new(factory));
        let registry = Arc::new(registry);

        let lease = registry.acquire(Device::Cpu).unwrap();
        let other = Arc::clone(&registry);
        let handle = std::thread::spawn(move || other.acquire(Device::Cpu).map(|_| ()).is_ok());

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!handle.is_finished());
        drop(lease);
        assert!(handle.join().unwrap());
    }
}
