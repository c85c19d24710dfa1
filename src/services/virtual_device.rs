use crate::error::{Result, WatcherError};
use evdev::KeyCode;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Синтез команды "копировать" для элемента в фокусе
pub trait CopyTrigger: Send + Sync {
    fn trigger_copy(&self) -> Result<()>;
}

const EV_SYN: i32 = 0;
const EV_KEY: i32 = 1;

/// Виртуальная клавиатура uinput, отправляющая Ctrl+C
pub struct VirtualDevice {
    device: Option<Mutex<uinput::Device>>,
    device_name: String,
    dry_run: bool,
}

impl VirtualDevice {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!("Инициализация VirtualDevice '{}' (dry_run: {})", device_name, dry_run);

        let device = if dry_run {
            None
        } else {
            Some(Mutex::new(Self::create_virtual_device(device_name)?))
        };

        Ok(Self {
            device,
            device_name: device_name.to_string(),
            dry_run,
        })
    }

    fn create_virtual_device(device_name: &str) -> Result<uinput::Device> {
        info!("Создание виртуального устройства uinput '{}' для синтеза Ctrl+C", device_name);

        let virtual_device = uinput::default()?
            .name(device_name)?
            .event(uinput::event::Keyboard::All)?
            .create()
            .map_err(|e| WatcherError::Internal(format!("Не удалось создать виртуальное устройство '{}': {}", device_name, e)))?;

        info!("Виртуальное устройство '{}' создано успешно", device_name);
        Ok(virtual_device)
    }

    /// Последовательность (код, значение) для Ctrl+C
    fn copy_chord() -> [(u16, i32); 4] {
        let ctrl = KeyCode::KEY_LEFTCTRL.code();
        let c = KeyCode::KEY_C.code();
        [(ctrl, 1), (c, 1), (c, 0), (ctrl, 0)]
    }
}

impl CopyTrigger for VirtualDevice {
    fn trigger_copy(&self) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Синтез Ctrl+C на '{}'", self.device_name);
            return Ok(());
        }

        let Some(device) = &self.device else {
            return Err(WatcherError::Internal("Виртуальное устройство недоступно".to_string()));
        };

        let mut device = device.lock();
        for (code, value) in Self::copy_chord() {
            device
                .write(EV_KEY, code as i32, value)
                .map_err(|e| WatcherError::Internal(format!("Не удалось отправить клавишу {}: {}", code, e)))?;

            // Синхронизируем после каждого изменения, иначе порядок может склеиться
            device
                .write(EV_SYN, 0, 0)
                .map_err(|e| WatcherError::Internal(format!("Не удалось синхронизировать события: {}", e)))?;
        }

        debug!("Ctrl+C отправлен через '{}'", self.device_name);
        Ok(())
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if !self.dry_run {
            info!("Закрытие виртуального устройства");
        }
    }
}
