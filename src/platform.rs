use std::path::{Path, PathBuf};

/// Name of the EFI variable carrying the parameter record
pub const EFI_VARIABLE_NAME: &str = "VentoyOsParam";
/// Vendor namespace of the EFI variable
pub const EFI_VARIABLE_GUID: &str = "77772020-2e77-6576-6e74-6f792e6e6574";

/// Where the running system exposes devices and firmware data.
///
/// `Default` points at the live system; tests root every path under a
/// temporary directory instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Platform {
    pub sys_block: PathBuf,
    pub sys_class_block: PathBuf,
    pub dev: PathBuf,
    pub acpi_tables: PathBuf,
    pub efi: PathBuf,
    pub memory: PathBuf,
}

impl Default for Platform {
    fn default() -> Self {
        Self::rooted("/")
    }
}

impl Platform {
    pub fn rooted<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            sys_block: root.join("sys/block"),
            sys_class_block: root.join("sys/class/block"),
            dev: root.join("dev"),
            acpi_tables: root.join("sys/firmware/acpi/tables"),
            efi: root.join("sys/firmware/efi"),
            memory: root.join("dev/mem"),
        }
    }

    pub fn acpi_table(&self, signature: &str) -> PathBuf {
        self.acpi_tables.join(signature)
    }

    fn efi_variable_name() -> String {
        format!("{}-{}", EFI_VARIABLE_NAME, EFI_VARIABLE_GUID)
    }

    /// efivarfs file, content prefixed by 4 bytes of attributes
    pub fn efivarfs_variable(&self) -> PathBuf {
        self.efi.join("efivars").join(Self::efi_variable_name())
    }

    /// Legacy sysfs interface, raw content
    pub fn sysfs_variable(&self) -> PathBuf {
        self.efi.join("vars").join(Self::efi_variable_name()).join("data")
    }

    pub fn device(&self, name: &str) -> PathBuf {
        self.dev.join(name)
    }
}
