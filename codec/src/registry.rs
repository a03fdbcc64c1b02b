//! Decoder registry with an explicit build-then-traffic lifecycle.
//!
//! Remote tables are collected while the registry is `Collecting`, bound once
//! with [`DecoderRegistry::bind`], and only then handed out for decoding.

use std::sync::Arc;

use log::debug;
use schema::{table_hash, RecvTable, SendTable, Unbound};
use wire::TableSet;

use crate::binding::RecvDecoder;
use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;

/// Lifecycle phase of a [`DecoderRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryPhase {
    /// Accepting remote tables.
    Collecting,
    /// Decoders built; read-only until reset.
    Bound,
    /// Released. No further use.
    Shutdown,
}

impl RegistryPhase {
    const fn name(self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Bound => "bound",
            Self::Shutdown => "shut down",
        }
    }
}

/// Owns the local receive tables and the decoders bound against one peer.
pub struct DecoderRegistry<R> {
    phase: RegistryPhase,
    limits: CodecLimits,
    local: Vec<Arc<RecvTable<R>>>,
    remote: Vec<Arc<SendTable<Unbound>>>,
    decoders: Vec<RecvDecoder<R>>,
}

impl<R> DecoderRegistry<R> {
    /// Creates a registry for the given local root tables.
    pub fn init(local: impl IntoIterator<Item = Arc<RecvTable<R>>>, limits: CodecLimits) -> Self {
        let local: Vec<_> = local.into_iter().collect();
        debug!("decoder registry initialised with {} local tables", local.len());
        Self {
            phase: RegistryPhase::Collecting,
            limits,
            local,
            remote: Vec::new(),
            decoders: Vec::new(),
        }
    }

    pub const fn phase(&self) -> RegistryPhase {
        self.phase
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn local_tables(&self) -> &[Arc<RecvTable<R>>] {
        &self.local
    }

    pub fn remote_tables(&self) -> &[Arc<SendTable<Unbound>>] {
        &self.remote
    }

    /// Adds one remote table. A table of the same name replaces the earlier one.
    pub fn register_remote(&mut self, table: Arc<SendTable<Unbound>>) -> CodecResult<()> {
        self.expect_phase(RegistryPhase::Collecting, "register remote tables")?;
        match self
            .remote
            .iter_mut()
            .find(|known| known.name().eq_ignore_ascii_case(table.name()))
        {
            Some(known) => {
                debug!("remote table {} replaced", table.name());
                *known = table;
            }
            None => self.remote.push(table),
        }
        Ok(())
    }

    /// Adds every table of a decoded transfer set and returns how many were added.
    pub fn register_table_set(&mut self, set: &TableSet) -> CodecResult<usize> {
        for table in &set.tables {
            self.register_remote(Arc::clone(table))?;
        }
        Ok(set.tables.len())
    }

    /// Binds every local root table to the remote table of the same name.
    ///
    /// Local tables the peer never sent are skipped. Returns the number of
    /// decoders built. On error the registry stays `Collecting`.
    pub fn bind(&mut self, allow_mismatch: bool) -> CodecResult<usize> {
        self.expect_phase(RegistryPhase::Collecting, "bind")?;
        let mut decoders = Vec::with_capacity(self.local.len());
        for local in &self.local {
            let Some(remote) = self.find_remote(local.name()) else {
                debug!("no remote table for {}, skipping", local.name());
                continue;
            };
            decoders.push(RecvDecoder::bind(remote, local, allow_mismatch, &self.limits)?);
        }
        debug!(
            "bound {} decoders against {} remote tables",
            decoders.len(),
            self.remote.len()
        );
        self.decoders = decoders;
        self.phase = RegistryPhase::Bound;
        Ok(self.decoders.len())
    }

    /// Decoder for the root table `name`.
    pub fn decoder(&self, name: &str) -> CodecResult<&RecvDecoder<R>> {
        self.expect_phase(RegistryPhase::Bound, "look up decoders")?;
        self.decoders
            .iter()
            .find(|decoder| decoder.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CodecError::UnknownTable {
                table: name.to_owned(),
            })
    }

    pub fn decoders(&self) -> &[RecvDecoder<R>] {
        &self.decoders
    }

    /// Fingerprint of the remote table `name`, if registered.
    pub fn remote_hash(&self, name: &str) -> Option<u64> {
        self.find_remote(name).map(|table| table_hash(&**table))
    }

    /// Whether the peer's table of the same name is identical to `local`.
    pub fn matches_local<T>(&self, local: &SendTable<T>) -> bool {
        self.remote_hash(local.name()) == Some(table_hash(local))
    }

    /// Drops remote tables and decoders so the registry can serve a new peer.
    pub fn reset(&mut self) -> CodecResult<()> {
        if self.phase == RegistryPhase::Shutdown {
            return Err(self.phase_error("reset"));
        }
        self.remote.clear();
        self.decoders.clear();
        self.phase = RegistryPhase::Collecting;
        Ok(())
    }

    /// Releases every table and decoder.
    pub fn shutdown(&mut self) {
        debug!("decoder registry shut down ({} decoders)", self.decoders.len());
        self.local.clear();
        self.remote.clear();
        self.decoders.clear();
        self.phase = RegistryPhase::Shutdown;
    }

    fn find_remote(&self, name: &str) -> Option<&Arc<SendTable<Unbound>>> {
        self.remote
            .iter()
            .find(|table| table.name().eq_ignore_ascii_case(name))
    }

    fn expect_phase(&self, phase: RegistryPhase, operation: &'static str) -> CodecResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.phase_error(operation))
        }
    }

    fn phase_error(&self, operation: &'static str) -> CodecError {
        CodecError::InvalidPhase {
            operation,
            phase: self.phase.name(),
        }
    }
}

impl<R> std::fmt::Debug for DecoderRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("phase", &self.phase)
            .field("local", &self.local.len())
            .field("remote", &self.remote.len())
            .field("decoders", &self.decoders)
            .finish()
    }
}
