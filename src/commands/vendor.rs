//! Vendor command implementation

use anyhow::Result;
use clap::Args;

use crate::config::GoModule;
use crate::exec::subprocess::run_checked_in;
use crate::utils::terminal::print_status;

/// Copy dependencies into the vendor directory
#[derive(Args, Debug)]
pub struct VendorCommand {}

impl VendorCommand {
    /// Execute the vendor command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        let module = GoModule::locate()?;
        print_status("Vendoring", &format!("module {}", module.name));
        run_checked_in("go", &["mod".to_string(), "vendor".to_string()], &module.dir)
    }
}
