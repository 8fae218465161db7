pub mod entities;

use std::str::FromStr;

use async_channel::{Receiver, Sender};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::model::ServiceHandle;
use entities::{Request, Response};

pub struct Service;

impl Service {
    pub fn start(uri: String, api_key: String) -> ServiceHandle<Request, Response> {
        let (to_service, requests) = async_channel::bounded(100);
        let (responses, from_service) = async_channel::bounded(100);
        tokio::spawn(async move {
            match run(uri, api_key, requests, responses).await {
                Ok(()) => log::info!("streaming client stopped"),
                Err(e) => log::error!("streaming client failed: {:?}", e),
            }
        });
        ServiceHandle::new(to_service, from_service)
    }
}

async fn run(
    uri: String,
    api_key: String,
    requests: Receiver<Request>,
    responses: Sender<Response>,
) -> Result<(), WsError> {
    let uri = format!("{}?api_key={}", uri, api_key);
    let (websocket, _response) = tokio_tungstenite::connect_async(uri.as_str()).await?;
    let (mut sink, mut stream) = websocket.split();
    tokio::spawn(async move {
        while let Ok(req) = requests.recv().await {
            if let Err(e) = sink.send(Message::Text(req.to_string())).await {
                log::error!("subscription send failed: {:?}", e);
                break;
            }
        }
    });
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match Response::from_str(&text) {
                Ok(msg) => {
                    if responses.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("error on parsing text: {} \n {:?}", text, e),
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(msg) => log::warn!("unknown response: {:?}", msg),
            Err(e) => {
                log::error!("stream error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
