//! Custom machine types
//!
//! Builds and validates machine type names such as `n2-custom-4-4096` or
//! `e2-custom-micro-2048`. Limits follow
//! <https://cloud.google.com/compute/docs/general-purpose-machines#custom_machine_types>.

use anyhow::{bail, Result};
use std::fmt;

/// CPU series that accept custom machine shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuSeries {
    N1,
    N2,
    N2D,
    E2,
    E2Micro,
    E2Small,
    E2Medium,
}

impl CpuSeries {
    pub const ALL: [CpuSeries; 7] = [
        CpuSeries::N1,
        CpuSeries::N2,
        CpuSeries::N2D,
        CpuSeries::E2,
        CpuSeries::E2Micro,
        CpuSeries::E2Small,
        CpuSeries::E2Medium,
    ];

    /// Machine type prefix used by the API
    pub fn prefix(self) -> &'static str {
        match self {
            CpuSeries::N1 => "custom",
            CpuSeries::N2 => "n2-custom",
            CpuSeries::N2D => "n2d-custom",
            CpuSeries::E2 => "e2-custom",
            CpuSeries::E2Micro => "e2-custom-micro",
            CpuSeries::E2Small => "e2-custom-small",
            CpuSeries::E2Medium => "e2-custom-medium",
        }
    }

    /// Shared-core E2 shapes have a fixed vCPU count
    pub fn is_shared_core(self) -> bool {
        matches!(self, CpuSeries::E2Micro | CpuSeries::E2Small | CpuSeries::E2Medium)
    }

    pub fn limit(self) -> TypeLimit {
        match self {
            CpuSeries::E2 => TypeLimit {
                allowed_cores: stepped(2, 32, 2),
                min_mem_per_core: 512,
                max_mem_per_core: 8192,
                extra_memory_limit: None,
            },
            CpuSeries::E2Micro => TypeLimit::shared(1024, 2048),
            CpuSeries::E2Small => TypeLimit::shared(2048, 4096),
            CpuSeries::E2Medium => TypeLimit::shared(4096, 8192),
            CpuSeries::N2 => TypeLimit {
                allowed_cores: stepped(2, 32, 2).into_iter().chain(stepped(36, 128, 4)).collect(),
                min_mem_per_core: 512,
                max_mem_per_core: 8192,
                extra_memory_limit: Some(624 << 10),
            },
            CpuSeries::N2D => TypeLimit {
                allowed_cores: vec![2, 4, 8, 16, 32, 48, 64, 80, 96],
                min_mem_per_core: 512,
                max_mem_per_core: 8192,
                extra_memory_limit: Some(768 << 10),
            },
            CpuSeries::N1 => TypeLimit {
                allowed_cores: std::iter::once(1).chain(stepped(2, 96, 2)).collect(),
                min_mem_per_core: 922,
                max_mem_per_core: 6656,
                extra_memory_limit: Some(624 << 10),
            },
        }
    }
}

impl std::str::FromStr for CpuSeries {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        CpuSeries::ALL
            .into_iter()
            .find(|series| series.prefix() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown custom CPU series: {}", s))
    }
}

impl fmt::Display for CpuSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Core and memory constraints of a CPU series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLimit {
    /// Empty means "not configurable"
    pub allowed_cores: Vec<u32>,
    pub min_mem_per_core: u32,
    pub max_mem_per_core: u32,
    /// Total memory ceiling when extended memory is allowed
    pub extra_memory_limit: Option<u32>,
}

impl TypeLimit {
    fn shared(min_mem_per_core: u32, max_mem_per_core: u32) -> Self {
        Self {
            allowed_cores: Vec::new(),
            min_mem_per_core,
            max_mem_per_core,
            extra_memory_limit: None,
        }
    }
}

fn stepped(start: u32, end: u32, step: usize) -> Vec<u32> {
    (start..=end).step_by(step).collect()
}

/// A validated custom machine shape in a zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMachineType {
    zone: String,
    series: CpuSeries,
    memory_mb: u32,
    core_count: u32,
}

impl CustomMachineType {
    /// Validate the requested shape. Shared-core E2 series always get 2 vCPUs.
    pub fn new(zone: &str, series: CpuSeries, memory_mb: u32, core_count: u32) -> Result<Self> {
        let core_count = if series.is_shared_core() { 2 } else { core_count };
        let cmt = Self {
            zone: zone.to_string(),
            series,
            memory_mb,
            core_count,
        };
        cmt.check()?;
        Ok(cmt)
    }

    fn check(&self) -> Result<()> {
        let limit = self.series.limit();

        if !limit.allowed_cores.is_empty() && !limit.allowed_cores.contains(&self.core_count) {
            bail!(
                "invalid number of cores requested. Allowed number of cores for {} is: {:?}",
                self.series,
                limit.allowed_cores
            );
        }

        if self.memory_mb % 256 != 0 {
            bail!("requested memory must be a multiple of 256 MB");
        }

        if self.memory_mb < self.core_count * limit.min_mem_per_core {
            bail!(
                "requested memory is too low. Minimal memory for {} is {} MB per core",
                self.series,
                limit.min_mem_per_core
            );
        }

        if self.memory_mb > self.core_count * limit.max_mem_per_core {
            match limit.extra_memory_limit {
                Some(extra) if self.memory_mb > extra => bail!(
                    "requested memory is too large. Maximum memory allowed for {} is {} MB",
                    self.series,
                    extra
                ),
                Some(_) => {}
                None => bail!(
                    "requested memory is too large. Maximum memory allowed for {} is {} MB per core",
                    self.series,
                    limit.max_mem_per_core
                ),
            }
        }

        Ok(())
    }

    pub fn is_extra_memory_used(&self) -> bool {
        self.memory_mb > self.core_count * self.series.limit().max_mem_per_core
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn series(&self) -> CpuSeries {
        self.series
    }

    pub fn memory_mb(&self) -> u32 {
        self.memory_mb
    }

    pub fn core_count(&self) -> u32 {
        self.core_count
    }

    /// Machine type name without the zone, e.g. `n2-custom-8-10240`.
    /// Instance templates use this form.
    pub fn short_name(&self) -> String {
        if self.series.is_shared_core() {
            format!("{}-{}", self.series, self.memory_mb)
        } else if self.is_extra_memory_used() {
            format!("{}-{}-{}-ext", self.series, self.core_count, self.memory_mb)
        } else {
            format!("{}-{}-{}", self.series, self.core_count, self.memory_mb)
        }
    }

    /// Zonal machine type path accepted by `instances.insert`
    pub fn uri(&self) -> String {
        format!("zones/{}/machineTypes/{}", self.zone, self.short_name())
    }
}

impl fmt::Display for CustomMachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}
