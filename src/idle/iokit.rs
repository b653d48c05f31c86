//! IOKit access to the `IOHIDSystem` registry entry.
//!
//! `HIDIdleTime` holds nanoseconds since the last HID event. Current systems
//! publish it as a `CFNumber`; older ones used an 8-byte `CFData`.

use std::ffi::CStr;
use std::ffi::c_char;

use core_foundation::base::CFAllocatorRef;
use core_foundation::base::CFType;
use core_foundation::base::CFTypeRef;
use core_foundation::base::TCFType;
use core_foundation::base::kCFAllocatorDefault;
use core_foundation::data::CFData;
use core_foundation::dictionary::CFMutableDictionaryRef;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_foundation::string::CFStringRef;
use tracing::warn;

use super::IdleRegistry;
use crate::error::IdleError;

type KernReturn = i32;
type MachPort = u32;
type IoObject = MachPort;

const KERN_SUCCESS: KernReturn = 0;
const MACH_PORT_NULL: MachPort = 0;
const IO_OBJECT_NULL: IoObject = 0;

const HID_SYSTEM_SERVICE: &CStr = c"IOHIDSystem";
const HID_IDLE_TIME_KEY: &str = "HIDIdleTime";

#[link(name = "IOKit", kind = "framework")]
unsafe extern "C" {
    fn IOMasterPort(bootstrap_port: MachPort, main_port: *mut MachPort) -> KernReturn;
    fn IOServiceMatching(name: *const c_char) -> CFMutableDictionaryRef;
    fn IOServiceGetMatchingService(main_port: MachPort, matching: CFMutableDictionaryRef) -> IoObject;
    fn IORegistryEntryCreateCFProperty(
        entry: IoObject,
        key: CFStringRef,
        allocator: CFAllocatorRef,
        options: u32,
    ) -> CFTypeRef;
    fn IOObjectRelease(object: IoObject) -> KernReturn;
}

unsafe extern "C" {
    static mach_task_self_: MachPort;
    fn mach_port_deallocate(task: MachPort, name: MachPort) -> KernReturn;
}

/// The I/O Kit main port plus the `IOHIDSystem` service entry.
#[derive(Debug)]
pub struct IoKitRegistry {
    main_port: MachPort,
    entry: IoObject,
}

impl IoKitRegistry {
    /// Open the main port and look up the `IOHIDSystem` service.
    pub fn open() -> Result<Self, IdleError> {
        let mut main_port = MACH_PORT_NULL;
        // SAFETY: `main_port` is a valid out-pointer for the duration of the call.
        let kr = unsafe { IOMasterPort(MACH_PORT_NULL, &raw mut main_port) };
        if kr != KERN_SUCCESS {
            return Err(IdleError::Unavailable(format!(
                "IOMasterPort failed with kern_return {kr}"
            )));
        }

        // SAFETY: the service name is a static NUL-terminated string. The
        // matching dictionary reference is consumed by
        // IOServiceGetMatchingService, including when it is null.
        let entry = unsafe {
            let matching = IOServiceMatching(HID_SYSTEM_SERVICE.as_ptr());
            IOServiceGetMatchingService(main_port, matching)
        };
        if entry == IO_OBJECT_NULL {
            deallocate_port(main_port);
            return Err(IdleError::Unavailable(
                "IOHIDSystem service not found".to_string(),
            ));
        }

        Ok(Self { main_port, entry })
    }
}

impl IdleRegistry for IoKitRegistry {
    fn read_idle_nanos(&self) -> Result<u64, IdleError> {
        let key = CFString::from_static_string(HID_IDLE_TIME_KEY);
        // SAFETY: `entry` stays valid until `close`, and `key` outlives the call.
        let raw = unsafe {
            IORegistryEntryCreateCFProperty(
                self.entry,
                key.as_concrete_TypeRef(),
                kCFAllocatorDefault,
                0,
            )
        };
        if raw.is_null() {
            return Err(IdleError::Read(format!(
                "{HID_IDLE_TIME_KEY} property not present"
            )));
        }

        // SAFETY: IORegistryEntryCreateCFProperty follows the create rule, so
        // ownership of `raw` moves into the wrapper.
        let value = unsafe { CFType::wrap_under_create_rule(raw) };
        decode_idle_time(&value)
    }

    fn close(&mut self) {
        // SAFETY: `entry` was returned by IOServiceGetMatchingService and is
        // released only here.
        let kr = unsafe { IOObjectRelease(self.entry) };
        if kr != KERN_SUCCESS {
            warn!("IOObjectRelease failed with kern_return {}", kr);
        }
        self.entry = IO_OBJECT_NULL;

        deallocate_port(self.main_port);
        self.main_port = MACH_PORT_NULL;
    }
}

fn decode_idle_time(value: &CFType) -> Result<u64, IdleError> {
    let nanos = if let Some(number) = value.downcast::<CFNumber>() {
        number.to_i64().ok_or_else(|| {
            IdleError::Read(format!("{HID_IDLE_TIME_KEY} is not an integer"))
        })?
    } else if let Some(data) = value.downcast::<CFData>() {
        let bytes: [u8; 8] = data.bytes().try_into().map_err(|_| {
            IdleError::Read(format!(
                "{HID_IDLE_TIME_KEY} has {} bytes, expected 8",
                data.len()
            ))
        })?;
        i64::from_ne_bytes(bytes)
    } else {
        return Err(IdleError::Read(format!(
            "{HID_IDLE_TIME_KEY} has an unexpected type"
        )));
    };

    u64::try_from(nanos)
        .map_err(|_| IdleError::Read(format!("{HID_IDLE_TIME_KEY} is negative: {nanos}")))
}

fn deallocate_port(port: MachPort) {
    // SAFETY: `port` is a send right obtained from IOMasterPort, and
    // mach_task_self_ is initialized by libSystem before main.
    let kr = unsafe { mach_port_deallocate(mach_task_self_, port) };
    if kr != KERN_SUCCESS {
        warn!("mach_port_deallocate failed with kern_return {}", kr);
    }
}
