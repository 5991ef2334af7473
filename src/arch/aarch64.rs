//! AArch64 helpers

/// Read the virtual count of the generic timer (CNTVCT_EL0)
///
/// The counter runs at the fixed frequency in CNTFRQ_EL0. Other targets
/// have no architected counter and read zero.
#[inline]
pub fn counter() -> u64 {
    #[cfg(target_arch = "aarch64")]
    {
        let count: u64;
        unsafe {
            core::arch::asm!(
                "isb",
                "mrs {}, cntvct_el0",
                out(reg) count,
                options(nomem, nostack, preserves_flags)
            );
        }
        count
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        0
    }
}
