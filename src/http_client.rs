use reqwest::redirect::Policy;
use reqwest::Client;

pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Outbound client settings. The client is built once and shared by every caller,
/// so it keeps no cookie store.
pub struct HttpClientConfig {
  pub http_proxy: Option<String>,
  pub user: Option<String>,
  pub pass: Option<String>,
  pub max_redirects: usize,
}

impl Default for HttpClientConfig {
  fn default() -> Self {
    HttpClientConfig {
      http_proxy: None,
      user: None,
      pass: None,
      max_redirects: DEFAULT_MAX_REDIRECTS,
    }
  }
}

impl HttpClientConfig {
  pub fn to_client(self) -> Result<Client, reqwest::Error> {
    let HttpClientConfig {
      http_proxy,
      user,
      pass,
      max_redirects,
    } = self;
    let mut client_builder = reqwest::ClientBuilder::new();

    if let Some(proxy_url) = http_proxy {
      let mut proxy = reqwest::Proxy::all(proxy_url)?;

      if let (Some(user_name), Some(password)) = (user, pass) {
        proxy = proxy.basic_auth(&user_name, &password);
      }

      client_builder = client_builder.proxy(proxy);
    } else {
      // system HTTP_PROXY/HTTPS_PROXY are ignored
      client_builder = client_builder.no_proxy();
    }

    let client = client_builder
      .redirect(Policy::limited(max_redirects))
      .build()?;

    Ok(client)
  }
}
