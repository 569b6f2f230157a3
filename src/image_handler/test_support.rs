//! 单元测试共用的图片样本与本地 HTTP 桩服务。

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

pub(crate) fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let r = (x % 255) as u8;
        let g = (y % 255) as u8;
        let b = ((x + y) % 255) as u8;
        Rgba([r, g, b, 255])
    });

    let dyn_img = DynamicImage::ImageRgba8(img);
    let mut cursor = Cursor::new(Vec::new());
    dyn_img
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

pub(crate) fn create_png_data_uri(width: u32, height: u32) -> String {
    let encoded = general_purpose::STANDARD.encode(create_png_bytes(width, height));
    format!("data:image/png;base64,{}", encoded)
}

/// 读取一条完整 HTTP 请求（请求头 + 按 Content-Length 或 chunked 结束的请求体）。
fn read_full_request(stream: &mut std::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };

        let headers = text[..header_end].to_ascii_lowercase();
        let body_len = buf.len() - (header_end + 4);

        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());

        match content_length {
            Some(expected) if body_len >= expected => break,
            Some(_) => continue,
            None if headers.contains("transfer-encoding: chunked") => {
                if text.ends_with("0\r\n\r\n") {
                    break;
                }
            }
            None => break,
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

/// 启动只应答一次的本地 HTTP 服务，返回地址与“捕获到的请求”。
pub(crate) fn spawn_one_shot_server(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
    let addr = listener.local_addr().expect("read local addr failed");

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept failed");
        let request = read_full_request(&mut stream);

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            body.len()
        );

        stream
            .write_all(response.as_bytes())
            .expect("write headers failed");
        stream.write_all(body.as_bytes()).expect("write body failed");
        stream.flush().expect("flush failed");

        request
    });

    (format!("http://127.0.0.1:{}/1/upload", addr.port()), server)
}
