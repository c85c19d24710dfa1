use crate::error::Result;
use crate::trace_if_enabled;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zbus::message::Type as MessageType;
use zbus::{Connection, MatchRule, Message, MessageStream};

use super::accessibility::{AccessibilityBus, AccessibleRef, Notification, NotificationKind, RawSelection};

const REGISTRY_BUS: &str = "org.a11y.atspi.Registry";
const REGISTRY_PATH: &str = "/org/a11y/atspi/registry";
const REGISTRY_INTERFACE: &str = "org.a11y.atspi.Registry";

const ACCESSIBLE_INTERFACE: &str = "org.a11y.atspi.Accessible";
const TEXT_INTERFACE: &str = "org.a11y.atspi.Text";

/// Координаты GetRangeExtents относительно экрана
const COORD_TYPE_SCREEN: u32 = 0;

/// Зарегистрированные события и сигналы, в которых они приходят
const SUBSCRIPTIONS: [(&str, &str, &str, NotificationKind); 2] = [
    (
        "object:text-selection-changed",
        "org.a11y.atspi.Event.Object",
        "TextSelectionChanged",
        NotificationKind::TextSelectionChanged,
    ),
    (
        "focus:",
        "org.a11y.atspi.Event.Focus",
        "Focus",
        NotificationKind::FocusChanged,
    ),
];

/// AT-SPI2 поверх D-Bus
pub struct AtspiBus {
    connection: Connection,
    /// pid владельцев уникальных имён шины
    pid_cache: DashMap<String, u32>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl AtspiBus {
    /// Подключиться к шине доступности по адресу из org.a11y.Bus
    pub async fn connect() -> Result<Self> {
        info!("Подключение к шине доступности AT-SPI");

        let session = Connection::session().await?;
        let reply = session
            .call_method(Some("org.a11y.Bus"), "/org/a11y/bus", Some("org.a11y.Bus"), "GetAddress", &())
            .await?;
        let address: String = reply.body().deserialize()?;
        debug!("Адрес шины доступности: {}", address);

        let connection = zbus::connection::Builder::address(address.as_str())?
            .build()
            .await?;

        info!("Шина доступности подключена");
        Ok(Self {
            connection,
            pid_cache: DashMap::new(),
            listeners: Mutex::new(Vec::new()),
        })
    }

    async fn register_event(&self, event: &str) -> Result<()> {
        // Новые реестры принимают (s, as, s), старые только (s)
        let properties: Vec<String> = Vec::new();
        let extended = self
            .connection
            .call_method(Some(REGISTRY_BUS), REGISTRY_PATH, Some(REGISTRY_INTERFACE), "RegisterEvent", &(event, properties, ""))
            .await;

        if let Err(e) = extended {
            debug!("RegisterEvent(s, as, s) не принят ({}), пробуем RegisterEvent(s)", e);
            self.connection
                .call_method(Some(REGISTRY_BUS), REGISTRY_PATH, Some(REGISTRY_INTERFACE), "RegisterEvent", &(event,))
                .await?;
        }

        debug!("Событие {} зарегистрировано", event);
        Ok(())
    }

    async fn call<B>(&self, source: &AccessibleRef, interface: &str, method: &str, body: &B) -> Result<Message>
    where
        B: serde::Serialize + zbus::zvariant::DynamicType + Sync,
    {
        Ok(self
            .connection
            .call_method(Some(source.bus_name.as_str()), source.path.as_str(), Some(interface), method, body)
            .await?)
    }

    async fn supports_text(&self, source: &AccessibleRef) -> Result<bool> {
        let reply = self.call(source, ACCESSIBLE_INTERFACE, "GetInterfaces", &()).await?;
        let interfaces: Vec<String> = reply.body().deserialize()?;
        Ok(interfaces.iter().any(|name| name == TEXT_INTERFACE))
    }

    async fn owner_pid(&self, bus_name: &str) -> Option<u32> {
        if let Some(pid) = self.pid_cache.get(bus_name) {
            return Some(*pid);
        }

        let reply = self
            .connection
            .call_method(
                Some("org.freedesktop.DBus"),
                "/org/freedesktop/DBus",
                Some("org.freedesktop.DBus"),
                "GetConnectionUnixProcessID",
                &(bus_name,),
            )
            .await;

        let pid = match reply.and_then(|reply| reply.body().deserialize::<u32>()) {
            Ok(pid) => pid,
            Err(e) => {
                debug!("pid владельца {} не определён: {}", bus_name, e);
                return None;
            }
        };

        self.pid_cache.insert(bus_name.to_string(), pid);
        Some(pid)
    }
}

/// Границы для `rect_from_bounds` из ответа GetRangeExtents (x, y, ширина, высота).
///
/// Пустой размер означает отсутствие геометрии: границ нет, и потребитель
/// берёт позицию указателя.
fn bounds_from_extents((x, y, width, height): (i32, i32, i32, i32)) -> SmallVec<[f64; 4]> {
    if width <= 0 || height <= 0 {
        return SmallVec::new();
    }
    let (left, top) = (f64::from(x), f64::from(y));
    smallvec![left, top, left + f64::from(width), top + f64::from(height)]
}

/// Источник уведомления из заголовка сигнала
fn notification_from_signal(message: &Message, kind: NotificationKind) -> Option<Notification> {
    let header = message.header();
    let bus_name = header.sender()?.to_string();
    let path = header.path()?.to_string();
    Some(Notification {
        kind,
        source: AccessibleRef { bus_name, path },
    })
}

#[async_trait::async_trait]
impl AccessibilityBus for AtspiBus {
    async fn subscribe(&self) -> Result<mpsc::Receiver<Notification>> {
        let (tx, rx) = mpsc::channel(64);
        let mut listeners = Vec::new();

        for (event, interface, member, kind) in SUBSCRIPTIONS {
            self.register_event(event).await?;

            let rule = MatchRule::builder()
                .msg_type(MessageType::Signal)
                .interface(interface)?
                .member(member)?
                .build();
            let mut stream = MessageStream::for_match_rule(rule, &self.connection, Some(64)).await?;

            let tx = tx.clone();
            listeners.push(tokio::spawn(async move {
                while let Some(message) = stream.next().await {
                    let message = match message {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("Ошибка сигнала {}: {}", member, e);
                            continue;
                        }
                    };

                    let Some(notification) = notification_from_signal(&message, kind) else {
                        continue;
                    };
                    trace_if_enabled!("Сигнал {} от {}", member, notification.source);

                    if tx.send(notification).await.is_err() {
                        break;
                    }
                }
            }));
        }

        self.listeners.lock().extend(listeners);
        Ok(rx)
    }

    async fn read_selection(&self, source: &AccessibleRef) -> Result<Option<RawSelection>> {
        if !self.supports_text(source).await? {
            return Ok(None);
        }

        let reply = self.call(source, TEXT_INTERFACE, "GetNSelections", &()).await?;
        let count: i32 = reply.body().deserialize()?;
        if count <= 0 {
            return Ok(None);
        }

        // Несколько диапазонов сводятся к первому
        let reply = self.call(source, TEXT_INTERFACE, "GetSelection", &(0i32,)).await?;
        let (start, end): (i32, i32) = reply.body().deserialize()?;
        if end <= start {
            return Ok(None);
        }

        let reply = self.call(source, TEXT_INTERFACE, "GetText", &(start, end)).await?;
        let text: String = reply.body().deserialize()?;

        let bounds = match self.call(source, TEXT_INTERFACE, "GetRangeExtents", &(start, end, COORD_TYPE_SCREEN)).await {
            Ok(reply) => {
                let extents: (i32, i32, i32, i32) = reply.body().deserialize()?;
                bounds_from_extents(extents)
            }
            Err(e) => {
                debug!("Границы выделения {} недоступны: {}", source, e);
                smallvec![]
            }
        };

        let pid = self.owner_pid(&source.bus_name).await;

        Ok(Some(RawSelection { text, bounds, pid }))
    }

    async fn unsubscribe_all(&self) {
        for handle in self.listeners.lock().drain(..) {
            handle.abort();
        }

        for (event, ..) in SUBSCRIPTIONS {
            let result = self
                .connection
                .call_method(Some(REGISTRY_BUS), REGISTRY_PATH, Some(REGISTRY_INTERFACE), "DeregisterEvent", &(event,))
                .await;
            if let Err(e) = result {
                debug!("DeregisterEvent {} не выполнен: {}", event, e);
            }
        }
    }
}
