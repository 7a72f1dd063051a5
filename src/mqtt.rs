use crate::prelude::*;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};

pub const CLIENT_ID: &str = "ups_monitor";

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    /// Relative to the configured topic; empty means the topic itself.
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    pub fn for_telemetry(telemetry: &Telemetry) -> Result<Message> {
        Ok(Message {
            topic: String::new(),
            retain: false,
            payload: serde_json::to_string(telemetry)?,
        })
    }

    /// Retained availability state on the LWT topic. The offline one is the last will.
    pub fn availability(online: bool) -> Message {
        Message {
            topic: "LWT".to_owned(),
            retain: true,
            payload: if online { "online" } else { "offline" }.to_owned(),
        }
    }

    /// Full topic this message is published on, under `base`.
    pub fn topic_under(&self, base: &str) -> String {
        if self.topic.is_empty() {
            base.to_owned()
        } else {
            format!("{}/{}", base, self.topic)
        }
    }
} // }}}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Message(Message),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

#[derive(Clone)]
pub struct Mqtt {
    config: config::Mqtt,
    channels: Channels,
}

impl Mqtt {
    pub fn new(config: config::Mqtt, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub fn options(&self) -> Result<MqttOptions> {
        let c = &self.config;
        let broker = c
            .broker()
            .ok_or_else(|| anyhow!("mqtt.rs:no broker configured"))?;

        let mut options = MqttOptions::new(CLIENT_ID, broker, c.port());

        let will = Message::availability(false);
        options.set_last_will(LastWill {
            topic: will.topic_under(c.topic()),
            message: bytes::Bytes::from(will.payload),
            qos: QoS::AtLeastOnce,
            retain: will.retain,
        });

        options.set_keep_alive(std::time::Duration::from_secs(60));
        if let (Some(u), Some(p)) = (c.username(), c.password()) {
            options.set_credentials(u, p);
        }

        Ok(options)
    }

    pub async fn start(&self) -> Result<()> {
        let options = self.options()?;

        info!(
            "initializing mqtt at {}:{}, topic {}",
            options.broker_address().0,
            options.broker_address().1,
            self.config.topic()
        );

        let (client, eventloop) = AsyncClient::new(options, 10);

        // subscribe before anything can be published
        let receiver = self.channels.to_mqtt.subscribe();

        futures::try_join!(
            self.receiver(client.clone(), eventloop),
            self.sender(client, receiver)
        )?;

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_mqtt.send(ChannelData::Shutdown);
    }

    // drives the connection; announces ourselves on every (re)connect
    async fn receiver(&self, client: AsyncClient, mut eventloop: EventLoop) -> Result<()> {
        let mut shutdown = self.channels.to_mqtt.subscribe();

        loop {
            let event = tokio::select! {
                event = eventloop.poll() => event,
                msg = shutdown.recv() => match msg {
                    Ok(ChannelData::Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                    _ => continue,
                },
            };

            match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    // non-blocking: the request queue is drained by this very loop
                    let online = Message::availability(true);
                    if let Err(err) = client.try_publish(
                        online.topic_under(self.config.topic()),
                        QoS::AtLeastOnce,
                        online.retain,
                        online.payload,
                    ) {
                        warn!("mqtt: could not announce online: {}", err);
                    }
                }
                Err(e) => {
                    error!("mqtt: {}", e);
                    info!("reconnecting in 5s");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
                _ => {} // keepalives etc
            }
        }

        info!("MQTT receiver loop exiting");
        Ok(())
    }

    // poller -> mqtt
    async fn sender(
        &self,
        client: AsyncClient,
        mut receiver: broadcast::Receiver<ChannelData>,
    ) -> Result<()> {
        use ChannelData::*;

        loop {
            match receiver.recv().await {
                Ok(Shutdown) | Err(broadcast::error::RecvError::Closed) => {
                    info!("MQTT sender received shutdown signal");
                    let _ = client.disconnect().await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("mqtt sender lagged, {} messages dropped", n);
                }
                Ok(Message(message)) => {
                    let topic = message.topic_under(self.config.topic());
                    debug!("publishing: {} = {}", topic, message.payload);
                    if let Err(err) = client
                        .publish(&topic, QoS::AtLeastOnce, message.retain, message.payload)
                        .await
                    {
                        warn!("mqtt publish to {} failed: {}", topic, err);
                    }
                }
            }
        }

        info!("MQTT sender loop exiting");
        Ok(())
    }
}
