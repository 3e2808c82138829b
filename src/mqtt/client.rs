use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use dotenv::dotenv;
use log::{error, info, warn};
use rumqttc::{Client, Event, LastWill, MqttOptions, Packet, QoS};

use crate::config::MqttConfig;
use crate::types::Sample;

/// Sensor ingestion loop: samples arrive as JSON over MQTT and are fanned
/// into the bounded sample channel. Runs until shutdown is signaled or the
/// channel consumer goes away.
pub fn run_mqtt_client(
    config: &MqttConfig,
    sample_sender: Arc<Sender<Sample>>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok(); // 加载 .env 文件

    let mut mqtt_options = MqttOptions::new(
        config.client_id.clone(),
        config.host.clone(),
        config.port,
    );

    // 凭证从环境变量读取，不进配置文件
    if let (Ok(user), Ok(pass)) = (env::var("MQTT_USER"), env::var("MQTT_PASS")) {
        mqtt_options.set_credentials(user, pass);
    }

    mqtt_options
        .set_keep_alive(Duration::from_secs(config.keep_alive as u64))
        .set_last_will(LastWill::new(
            config.topic.clone(),
            "offline",
            QoS::AtLeastOnce,
            false,
        ));

    let (client, mut connection) = Client::new(mqtt_options, 10);
    client.subscribe(config.topic.clone(), QoS::AtLeastOnce)?;

    for event in connection.iter() {
        // 检查关闭信号
        if shutdown_signal.load(Ordering::Relaxed) {
            info!("MQTT thread received shutdown signal, exiting gracefully");
            break;
        }

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == config.topic => {
                match parse_sample(&publish.payload) {
                    Ok(sample) => {
                        if sample_sender.send(sample).is_err() {
                            // 通道断开表示会话端已关闭，优雅退出
                            info!("Sample channel disconnected, MQTT thread exiting");
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid sensor data: {}", e),
                }
            }
            Ok(Event::Incoming(_)) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                return Err(e.into());
            }
            _ => {}
        }
    }

    Ok(())
}

fn parse_sample(payload: &[u8]) -> Result<Sample, String> {
    let payload_str = std::str::from_utf8(payload).map_err(|e| format!("Invalid UTF-8: {}", e))?;

    serde_json::from_str::<Sample>(payload_str).map_err(|e| format!("JSON parsing error: {}", e))
}
