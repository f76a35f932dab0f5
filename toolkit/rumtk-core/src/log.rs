/*
 * rumtk attempts to implement HL7 and medical protocols for interoperability in medicine.
 * This toolkit aims to be reliable, simple, performant, and standards compliant.
 * Copyright (C) 2025  Luis M. Santos, M.D.
 *
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; if not, write to the Free Software
 * Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA
 */

///
/// Thin wrapper around [tracing_subscriber] so every rumtk binary sets up
/// structured logging the same way. Libraries should never install a
/// subscriber themselves; only the binaries (`rumtk-interface`,
/// `rumtk-v2-interface`) call [logging::init_logging] once at startup.
///
pub mod logging {
    use once_cell::sync::OnceCell;
    use tracing_subscriber::{fmt, EnvFilter};

    static LOGGING_INITIALIZED: OnceCell<()> = OnceCell::new();

    ///
    /// Installs a global [tracing] subscriber reading its filter directives
    /// from the `RUMTK_LOG` environment variable, falling back to `level`
    /// when unset. Safe to call more than once; only the first call takes
    /// effect.
    ///
    /// # Examples
    /// ```
    /// use rumtk_core::log::logging::init_logging;
    /// init_logging("info");
    /// tracing::info!("logging initialized");
    /// ```
    ///
    pub fn init_logging(level: &str) {
        LOGGING_INITIALIZED.get_or_init(|| {
            let filter = EnvFilter::try_from_env("RUMTK_LOG")
                .unwrap_or_else(|_| EnvFilter::new(level.to_owned()));
            let _ = fmt().with_env_filter(filter).try_init();
        });
    }
}
